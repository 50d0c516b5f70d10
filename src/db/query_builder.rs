use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::Serialize;

/// One page of a filtered, ordered query.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, already clamped to `1..=num_pages`
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    /// Never zero; an empty result still has one (empty) page.
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }
}

/// Helper struct for building list queries
pub struct QueryBuilder<E: EntityTrait> {
    query: Select<E>,
    page: u64,
    per_page: u64,
}

impl<E: EntityTrait> QueryBuilder<E> {
    /// Starts from an already scoped select
    pub fn new(query: Select<E>) -> Self {
        Self {
            query,
            page: 1,
            per_page: 10,
        }
    }

    /// Add pagination
    pub fn paginate(mut self, page: u64, per_page: u64) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.max(1);
        self
    }

    /// Add a filter condition; `None` leaves the query untouched
    pub fn filter(mut self, condition: Option<Condition>) -> Self {
        if let Some(condition) = condition {
            self.query = self.query.filter(condition);
        }
        self
    }

    /// Add ordering
    pub fn order_by<C>(mut self, column: C, order: Order) -> Self
    where
        C: ColumnTrait,
    {
        self.query = self.query.order_by(column, order);
        self
    }

    /// Every matching row, ignoring pagination
    pub async fn fetch_all<C>(self, db: &C) -> Result<Vec<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        self.query.all(db).await
    }

    /// The requested page. A page past the end is clamped to the last page.
    pub async fn fetch_page<C>(self, db: &C) -> Result<Page<E::Model>, DbErr>
    where
        C: ConnectionTrait,
        E::Model: FromQueryResult + Send + Sync,
    {
        let paginator = self.query.paginate(db, self.per_page);
        let counts = paginator.num_items_and_pages().await?;
        let num_pages = counts.number_of_pages.max(1);
        let page = self.page.min(num_pages);
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page {
            items,
            page,
            per_page: self.per_page,
            total: counts.number_of_items,
            num_pages,
        })
    }
}

/// Helper for building case-insensitive substring search conditions
pub struct SearchBuilder {
    pattern: Option<String>,
    condition: Condition,
}

impl SearchBuilder {
    /// Blank text matches everything
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        let pattern = if text.is_empty() {
            None
        } else {
            Some(format!("%{}%", escape_like(&text.to_lowercase())))
        };
        Self {
            pattern,
            condition: Condition::any(),
        }
    }

    /// OR another column into the search
    pub fn add_like<C: ColumnTrait>(mut self, column: C) -> Self {
        if let Some(pattern) = &self.pattern {
            let lowered = Func::lower(Expr::col((column.entity_name(), column)));
            self.condition = self.condition.add(
                Expr::expr(lowered).like(LikeExpr::new(pattern.clone()).escape('\\')),
            );
        }
        self
    }

    /// Build the final condition
    pub fn build(self) -> Option<Condition> {
        self.pattern.map(|_| self.condition)
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn page_navigation_flags() {
        let page = Page {
            items: vec![1, 2],
            page: 2,
            per_page: 2,
            total: 5,
            num_pages: 3,
        };
        assert!(page.has_previous());
        assert!(page.has_next());

        let last = Page { page: 3, ..page };
        assert!(!last.has_next());
    }
}
