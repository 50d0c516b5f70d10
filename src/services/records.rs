//! Hub-scoped record access shared by every entity service.

use metrics::counter;
use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::query_builder::Page;
use crate::errors::ServiceError;
use crate::export::{ExportFile, ExportFormat};
use crate::services::listing::{self, ListDescriptor, ListParams};

/// Logs a storage failure and lifts it into a `ServiceError`.
pub(crate) fn db_failure(entity: &'static str, op: &'static str) -> impl Fn(DbErr) -> ServiceError {
    move |e| {
        error!(entity, op, error = %e, "storage failure");
        ServiceError::db_error(e)
    }
}

pub(crate) fn record_created(entity: &'static str, hub_id: Uuid, id: Uuid) {
    counter!("manufacturing_records_created", 1, "entity" => entity);
    info!(%hub_id, %id, entity, "record created");
}

pub(crate) fn record_updated(entity: &'static str, hub_id: Uuid, id: Uuid) {
    counter!("manufacturing_records_updated", 1, "entity" => entity);
    info!(%hub_id, %id, entity, "record updated");
}

pub(crate) fn records_updated(entity: &'static str, hub_id: Uuid, affected: u64) {
    counter!("manufacturing_records_updated", affected, "entity" => entity);
    info!(%hub_id, entity, affected, "records updated");
}

/// Live record of this hub, or `NotFound`.
pub async fn get<E, C>(db: &C, hub_id: Uuid, id: Uuid) -> Result<E::Model, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    E::find_scoped(hub_id, id)
        .one(db)
        .await
        .map_err(db_failure(E::LABEL, "get"))?
        .ok_or_else(|| ServiceError::record_not_found(E::LABEL, id))
}

/// Record of this hub whether or not it was soft-deleted.
pub async fn get_including_deleted<E, C>(
    db: &C,
    hub_id: Uuid,
    id: Uuid,
) -> Result<E::Model, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    E::find_including_deleted(hub_id, id)
        .one(db)
        .await
        .map_err(db_failure(E::LABEL, "get_including_deleted"))?
        .ok_or_else(|| ServiceError::record_not_found(E::LABEL, id))
}

pub async fn list_including_deleted<E, C>(
    db: &C,
    hub_id: Uuid,
) -> Result<Vec<E::Model>, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    E::including_deleted(hub_id)
        .all(db)
        .await
        .map_err(db_failure(E::LABEL, "list_including_deleted"))
}

pub async fn count<E, C>(db: &C, hub_id: Uuid) -> Result<u64, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
    E::Model: Send + Sync,
{
    E::scoped(hub_id)
        .count(db)
        .await
        .map_err(db_failure(E::LABEL, "count"))
}

pub async fn list<E, C>(
    db: &C,
    hub_id: Uuid,
    params: &ListParams,
) -> Result<Page<E::Model>, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
    E::Model: Send + Sync,
{
    listing::list_page::<E, C>(db, hub_id, params)
        .await
        .map_err(db_failure(E::LABEL, "list"))
}

pub async fn rows<E, C>(
    db: &C,
    hub_id: Uuid,
    models: &[E::Model],
) -> Result<Vec<Vec<String>>, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    listing::rows::<E, C>(db, hub_id, models)
        .await
        .map_err(db_failure(E::LABEL, "rows"))
}

/// The whole filtered, sorted listing rendered as a file.
pub async fn export<E, C>(
    db: &C,
    hub_id: Uuid,
    params: &ListParams,
    format: ExportFormat,
) -> Result<ExportFile, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    let models = listing::list_all::<E, C>(db, hub_id, params)
        .await
        .map_err(db_failure(E::LABEL, "export"))?;
    let rows = rows::<E, C>(db, hub_id, &models).await?;

    info!(%hub_id, entity = E::LABEL, rows = rows.len(), ?format, "export rendered");
    ExportFile::render(format, E::EXPORT_STEM, E::EXPORT_HEADERS, &rows)
}

/// Soft-deletes one live record of this hub.
pub async fn soft_delete<E, C>(db: &C, hub_id: Uuid, id: Uuid) -> Result<(), ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    let result = E::soft_delete_many(hub_id, vec![id])
        .exec(db)
        .await
        .map_err(db_failure(E::LABEL, "soft_delete"))?;

    if result.rows_affected == 0 {
        return Err(ServiceError::record_not_found(E::LABEL, id));
    }

    counter!("manufacturing_records_deleted", 1, "entity" => E::LABEL);
    info!(%hub_id, %id, entity = E::LABEL, "record soft-deleted");
    Ok(())
}

/// Soft-deletes the live records of this hub among `ids`; returns how many changed.
pub async fn soft_delete_many<E, C>(db: &C, hub_id: Uuid, ids: &[Uuid]) -> Result<u64, ServiceError>
where
    E: ListDescriptor,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let result = E::soft_delete_many(hub_id, ids.to_vec())
        .exec(db)
        .await
        .map_err(db_failure(E::LABEL, "bulk_delete"))?;

    counter!(
        "manufacturing_records_deleted",
        result.rows_affected,
        "entity" => E::LABEL
    );
    info!(%hub_id, entity = E::LABEL, affected = result.rows_affected, "bulk soft delete");
    Ok(result.rows_affected)
}
