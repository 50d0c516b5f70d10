//! Persistence layer for the manufacturing module.
//!
//! Every record type shares the hub base shape: a UUID key, the owning
//! `hub_id`, `created_at` / `updated_at` timestamps and the soft-delete pair
//! (`is_deleted`, `deleted_at`). Rows are never removed by application paths;
//! [`SoftDelete`] is the single place that knows how to hide them.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter, Select, UpdateMany,
};
use uuid::Uuid;

/// Generates the lifecycle hooks and the [`SoftDelete`] impl shared by every
/// hub-scoped entity. Expects `id`, `hub_id`, `created_at`, `updated_at`,
/// `is_deleted` and `deleted_at` columns.
macro_rules! hub_record {
    () => {
        #[::async_trait::async_trait]
        impl ActiveModelBehavior for ActiveModel {
            async fn before_save<C: ConnectionTrait>(
                mut self,
                _db: &C,
                insert: bool,
            ) -> Result<Self, DbErr> {
                let now = ::chrono::Utc::now();
                if insert {
                    if self.id.is_not_set() {
                        self.id = ::sea_orm::ActiveValue::Set(::uuid::Uuid::new_v4());
                    }
                    if self.created_at.is_not_set() {
                        self.created_at = ::sea_orm::ActiveValue::Set(now);
                    }
                    if self.is_deleted.is_not_set() {
                        self.is_deleted = ::sea_orm::ActiveValue::Set(false);
                    }
                    if self.deleted_at.is_not_set() {
                        self.deleted_at = ::sea_orm::ActiveValue::Set(None);
                    }
                }
                self.updated_at = ::sea_orm::ActiveValue::Set(now);
                Ok(self)
            }
        }

        impl $crate::entities::SoftDelete for Entity {
            fn record_id(model: &Model) -> ::uuid::Uuid {
                model.id
            }

            fn id_column() -> Column {
                Column::Id
            }

            fn hub_column() -> Column {
                Column::HubId
            }

            fn deleted_flag_column() -> Column {
                Column::IsDeleted
            }

            fn deleted_at_column() -> Column {
                Column::DeletedAt
            }

            fn updated_at_column() -> Column {
                Column::UpdatedAt
            }
        }
    };
}

pub mod batch_ingredient;
pub mod bill_of_materials;
pub mod bom_line;
pub mod production_batch;
pub mod production_order;

/// Tenant scoping and soft-delete visibility for hub records.
pub trait SoftDelete: EntityTrait {
    fn record_id(model: &Self::Model) -> Uuid;
    fn id_column() -> Self::Column;
    fn hub_column() -> Self::Column;
    fn deleted_flag_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;

    /// Live records of one hub.
    fn scoped(hub_id: Uuid) -> Select<Self> {
        Self::find()
            .filter(Self::hub_column().eq(hub_id))
            .filter(Self::deleted_flag_column().eq(false))
    }

    /// Every record of one hub, soft-deleted ones included. Administrative use only.
    fn including_deleted(hub_id: Uuid) -> Select<Self> {
        Self::find().filter(Self::hub_column().eq(hub_id))
    }

    fn find_scoped(hub_id: Uuid, id: Uuid) -> Select<Self> {
        Self::scoped(hub_id).filter(Self::id_column().eq(id))
    }

    fn find_including_deleted(hub_id: Uuid, id: Uuid) -> Select<Self> {
        Self::including_deleted(hub_id).filter(Self::id_column().eq(id))
    }

    /// Set-based soft delete of the live records among `ids`.
    fn soft_delete_many(hub_id: Uuid, ids: Vec<Uuid>) -> UpdateMany<Self> {
        let now = Utc::now();
        Self::update_many()
            .col_expr(Self::deleted_flag_column(), Expr::value(true))
            .col_expr(Self::deleted_at_column(), Expr::value(now))
            .col_expr(Self::updated_at_column(), Expr::value(now))
            .filter(Self::hub_column().eq(hub_id))
            .filter(Self::deleted_flag_column().eq(false))
            .filter(Self::id_column().is_in(ids))
    }
}
