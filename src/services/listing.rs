//! The list/search/sort/paginate/export pipeline, written once for every entity.
//!
//! An entity opts in by implementing [`ListDescriptor`]: the columns searched,
//! the sort allow-list and the export layout. Query-string input is normalised
//! into [`ListParams`] before it reaches the database, so unknown sort keys,
//! odd page sizes and non-numeric pages never fail a request.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, Order, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::db::query_builder::{Page, QueryBuilder, SearchBuilder};
use crate::entities::{bill_of_materials, production_order, SoftDelete};
use crate::export::ExportFormat;

pub const PER_PAGE_CHOICES: [u64; 4] = [10, 25, 50, 100];
pub const DEFAULT_PER_PAGE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn order(&self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

/// Ids of the records a page of rows points at, so display names can be
/// fetched in one query per referenced table.
#[derive(Debug, Default)]
pub struct ReferenceIds {
    pub boms: BTreeSet<Uuid>,
    pub orders: BTreeSet<Uuid>,
}

/// Display text of referenced records. Soft-deleted referents keep their name.
#[derive(Debug, Default)]
pub struct ReferenceNames {
    boms: HashMap<Uuid, String>,
    orders: HashMap<Uuid, String>,
}

impl ReferenceNames {
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        hub_id: Uuid,
        ids: ReferenceIds,
    ) -> Result<Self, DbErr> {
        let mut names = Self::default();

        if !ids.boms.is_empty() {
            names.boms = bill_of_materials::Entity::including_deleted(hub_id)
                .filter(bill_of_materials::Column::Id.is_in(ids.boms))
                .all(db)
                .await?
                .into_iter()
                .map(|bom| (bom.id, bom.name))
                .collect();
        }

        if !ids.orders.is_empty() {
            names.orders = production_order::Entity::including_deleted(hub_id)
                .filter(production_order::Column::Id.is_in(ids.orders))
                .all(db)
                .await?
                .into_iter()
                .map(|order| (order.id, order.order_number))
                .collect();
        }

        Ok(names)
    }

    pub fn bom(&self, id: Option<Uuid>) -> String {
        id.and_then(|id| self.boms.get(&id).cloned())
            .unwrap_or_default()
    }

    pub fn order(&self, id: Option<Uuid>) -> String {
        id.and_then(|id| self.orders.get(&id).cloned())
            .unwrap_or_default()
    }
}

/// Per-entity search, sort and export layout.
pub trait ListDescriptor: SoftDelete {
    /// Record type name used in messages, logs and metric labels
    const LABEL: &'static str;
    /// Route segment, also used as the list payload key
    const ROUTE: &'static str;
    const DEFAULT_SORT: &'static str;
    const DEFAULT_DIR: SortDir = SortDir::Asc;
    const EXPORT_STEM: &'static str;
    const EXPORT_HEADERS: &'static [&'static str];

    fn search_columns() -> Vec<Self::Column>;

    /// Maps a logical sort key onto its column; `None` for keys outside the allow-list.
    fn sort_column(key: &str) -> Option<Self::Column>;

    /// Orderings applied after the requested sort, before the final id tie-break.
    fn secondary_order() -> Vec<(Self::Column, Order)> {
        Vec::new()
    }

    fn references(_model: &Self::Model) -> ReferenceIds {
        ReferenceIds::default()
    }

    /// One display/export cell per `EXPORT_HEADERS` entry.
    fn row(model: &Self::Model, refs: &ReferenceNames) -> Vec<String>;
}

/// Raw list query string: `q`, `sort`, `dir`, `page`, `per_page`, `view`, `export`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub view: Option<String>,
    pub export: Option<String>,
}

/// Normalised list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListParams {
    pub search: String,
    pub sort: String,
    pub dir: SortDir,
    pub page: u64,
    pub per_page: u64,
    pub view: String,
    #[serde(skip)]
    pub export: Option<ExportFormat>,
}

impl ListParams {
    /// First page, default sort, ten per page: what mutations re-render.
    pub fn first_page<E: ListDescriptor>() -> Self {
        Self::from_query::<E>(&ListQuery::default())
    }

    pub fn from_query<E: ListDescriptor>(query: &ListQuery) -> Self {
        let requested_sort = query
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|key| E::sort_column(key).is_some());

        let sort = requested_sort.unwrap_or(E::DEFAULT_SORT).to_string();

        let dir = match query.dir.as_deref().map(str::trim) {
            Some("desc") => SortDir::Desc,
            Some(_) => SortDir::Asc,
            None if requested_sort.is_none() => E::DEFAULT_DIR,
            None => SortDir::Asc,
        };

        let page = query
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        let per_page = query
            .per_page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|size| PER_PAGE_CHOICES.contains(size))
            .unwrap_or(DEFAULT_PER_PAGE);

        let view = match query.view.as_deref() {
            Some("cards") => "cards",
            _ => "table",
        }
        .to_string();

        Self {
            search: query.q.as_deref().unwrap_or_default().trim().to_string(),
            sort,
            dir,
            page,
            per_page,
            view,
            export: query.export.as_deref().and_then(ExportFormat::from_param),
        }
    }
}

/// Hub-scoped, searched and ordered query for `params`, not yet paginated.
pub fn list_query<E: ListDescriptor>(hub_id: Uuid, params: &ListParams) -> QueryBuilder<E> {
    let search = E::search_columns()
        .into_iter()
        .fold(SearchBuilder::new(&params.search), |builder, column| {
            builder.add_like(column)
        })
        .build();

    let sort_column = E::sort_column(&params.sort)
        .or_else(|| E::sort_column(E::DEFAULT_SORT));

    let mut builder = QueryBuilder::new(E::scoped(hub_id)).filter(search);
    if let Some(column) = sort_column {
        builder = builder.order_by(column, params.dir.order());
    }
    for (column, order) in E::secondary_order() {
        builder = builder.order_by(column, order);
    }
    builder.order_by(E::id_column(), Order::Asc)
}

pub async fn list_page<E, C>(
    db: &C,
    hub_id: Uuid,
    params: &ListParams,
) -> Result<Page<E::Model>, DbErr>
where
    E: ListDescriptor,
    C: ConnectionTrait,
    E::Model: Send + Sync,
{
    list_query::<E>(hub_id, params)
        .paginate(params.page, params.per_page)
        .fetch_page(db)
        .await
}

/// Same filter and order as the listing, every row.
pub async fn list_all<E, C>(db: &C, hub_id: Uuid, params: &ListParams) -> Result<Vec<E::Model>, DbErr>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    list_query::<E>(hub_id, params).fetch_all(db).await
}

/// Display/export rows for `models`, references resolved.
pub async fn rows<E, C>(db: &C, hub_id: Uuid, models: &[E::Model]) -> Result<Vec<Vec<String>>, DbErr>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    let mut ids = ReferenceIds::default();
    for model in models {
        let refs = E::references(model);
        ids.boms.extend(refs.boms);
        ids.orders.extend(refs.orders);
    }
    let names = ReferenceNames::load(db, hub_id, ids).await?;
    Ok(models.iter().map(|model| E::row(model, &names)).collect())
}

/// Bulk operations accepted by the `/bulk/` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    Delete,
}
