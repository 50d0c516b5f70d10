use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, Order, QueryFilter, QueryOrder,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::query_builder::Page,
    entities::{
        bill_of_materials::{self, Entity as BillOfMaterialsEntity},
        SoftDelete,
    },
    errors::ServiceError,
    export::{bool_cell, decimal_cell, ExportFile, ExportFormat},
    forms::{BillOfMaterialsForm, InputPolicy},
    services::{
        listing::{BulkAction, ListDescriptor, ListParams, ReferenceNames},
        records,
    },
};

impl ListDescriptor for BillOfMaterialsEntity {
    const LABEL: &'static str = "BillOfMaterials";
    const ROUTE: &'static str = "bill_of_materialses";
    const DEFAULT_SORT: &'static str = "code";
    const EXPORT_STEM: &'static str = "bill_of_materialses";
    const EXPORT_HEADERS: &'static [&'static str] =
        &["Code", "Name", "Is Active", "Output Quantity", "Notes"];

    fn search_columns() -> Vec<bill_of_materials::Column> {
        vec![
            bill_of_materials::Column::Name,
            bill_of_materials::Column::Code,
            bill_of_materials::Column::Notes,
        ]
    }

    fn sort_column(key: &str) -> Option<bill_of_materials::Column> {
        use bill_of_materials::Column;
        match key {
            "code" => Some(Column::Code),
            "name" => Some(Column::Name),
            "is_active" => Some(Column::IsActive),
            "output_quantity" => Some(Column::OutputQuantity),
            "notes" => Some(Column::Notes),
            "created_at" => Some(Column::CreatedAt),
            _ => None,
        }
    }

    fn row(model: &bill_of_materials::Model, _refs: &ReferenceNames) -> Vec<String> {
        vec![
            model.code.clone(),
            model.name.clone(),
            bool_cell(model.is_active),
            decimal_cell(model.output_quantity),
            model.notes.clone(),
        ]
    }
}

/// Bills of materials: the recipes production orders are built from.
#[derive(Clone)]
pub struct BillOfMaterialsService {
    db: Arc<DatabaseConnection>,
    policy: InputPolicy,
}

impl BillOfMaterialsService {
    pub fn new(db: Arc<DatabaseConnection>, policy: InputPolicy) -> Self {
        Self { db, policy }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        hub_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<bill_of_materials::Model>, ServiceError> {
        records::list::<BillOfMaterialsEntity, _>(&*self.db, hub_id, params).await
    }

    pub async fn rows(
        &self,
        hub_id: Uuid,
        models: &[bill_of_materials::Model],
    ) -> Result<Vec<Vec<String>>, ServiceError> {
        records::rows::<BillOfMaterialsEntity, _>(&*self.db, hub_id, models).await
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        hub_id: Uuid,
        params: &ListParams,
        format: ExportFormat,
    ) -> Result<ExportFile, ServiceError> {
        records::export::<BillOfMaterialsEntity, _>(&*self.db, hub_id, params, format).await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<bill_of_materials::Model, ServiceError> {
        records::get::<BillOfMaterialsEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn get_including_deleted(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<bill_of_materials::Model, ServiceError> {
        records::get_including_deleted::<BillOfMaterialsEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn list_including_deleted(
        &self,
        hub_id: Uuid,
    ) -> Result<Vec<bill_of_materials::Model>, ServiceError> {
        records::list_including_deleted::<BillOfMaterialsEntity, _>(&*self.db, hub_id).await
    }

    pub async fn count(&self, hub_id: Uuid) -> Result<u64, ServiceError> {
        records::count::<BillOfMaterialsEntity, _>(&*self.db, hub_id).await
    }

    /// `(id, name)` of the live BOMs of this hub, for select inputs.
    pub async fn choices(&self, hub_id: Uuid) -> Result<Vec<(Uuid, String)>, ServiceError> {
        let boms = BillOfMaterialsEntity::scoped(hub_id)
            .order_by(bill_of_materials::Column::Name, Order::Asc)
            .all(&*self.db)
            .await
            .map_err(records::db_failure("BillOfMaterials", "choices"))?;
        Ok(boms.into_iter().map(|bom| (bom.id, bom.name)).collect())
    }

    #[instrument(skip(self, form))]
    pub async fn create(
        &self,
        hub_id: Uuid,
        form: &BillOfMaterialsForm,
    ) -> Result<bill_of_materials::Model, ServiceError> {
        let input = form.parse(self.policy)?;

        let bom = bill_of_materials::ActiveModel {
            hub_id: Set(hub_id),
            name: Set(input.name),
            code: Set(input.code),
            output_quantity: Set(input.output_quantity),
            notes: Set(input.notes),
            is_active: Set(input.is_active),
            ..Default::default()
        };

        let created = bom
            .insert(&*self.db)
            .await
            .map_err(records::db_failure("BillOfMaterials", "create"))?;

        records::record_created("BillOfMaterials", hub_id, created.id);
        Ok(created)
    }

    /// Overwrites every editable field.
    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        hub_id: Uuid,
        id: Uuid,
        form: &BillOfMaterialsForm,
    ) -> Result<bill_of_materials::Model, ServiceError> {
        let existing = self.get(hub_id, id).await?;
        let input = form.parse(self.policy)?;

        let mut bom: bill_of_materials::ActiveModel = existing.into();
        bom.name = Set(input.name);
        bom.code = Set(input.code);
        bom.output_quantity = Set(input.output_quantity);
        bom.notes = Set(input.notes);
        bom.is_active = Set(input.is_active);

        let updated = bom
            .update(&*self.db)
            .await
            .map_err(records::db_failure("BillOfMaterials", "update"))?;

        records::record_updated("BillOfMaterials", hub_id, id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, hub_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        records::soft_delete::<BillOfMaterialsEntity, _>(&*self.db, hub_id, id).await
    }

    /// Flips `is_active` on one live BOM.
    #[instrument(skip(self))]
    pub async fn toggle_status(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<bill_of_materials::Model, ServiceError> {
        let existing = self.get(hub_id, id).await?;
        let next = !existing.is_active;

        let mut bom: bill_of_materials::ActiveModel = existing.into();
        bom.is_active = Set(next);
        let updated = bom
            .update(&*self.db)
            .await
            .map_err(records::db_failure("BillOfMaterials", "toggle_status"))?;

        records::record_updated("BillOfMaterials", hub_id, id);
        info!(%hub_id, %id, is_active = next, "BOM status toggled");
        Ok(updated)
    }

    /// Applies `action` to the live BOMs of this hub among `ids` in one statement.
    /// Unknown actions change nothing.
    #[instrument(skip(self, ids))]
    pub async fn bulk_action(
        &self,
        hub_id: Uuid,
        ids: &[Uuid],
        action: &str,
    ) -> Result<u64, ServiceError> {
        let action = match BulkAction::from_str(action.trim()) {
            Ok(action) => action,
            Err(_) => {
                warn!(%hub_id, action, "ignoring unknown bulk action");
                return Ok(0);
            }
        };
        if ids.is_empty() {
            return Ok(0);
        }

        let active = match action {
            BulkAction::Delete => {
                return records::soft_delete_many::<BillOfMaterialsEntity, _>(
                    &*self.db, hub_id, ids,
                )
                .await
            }
            BulkAction::Activate => true,
            BulkAction::Deactivate => false,
        };

        let result = BillOfMaterialsEntity::update_many()
            .col_expr(bill_of_materials::Column::IsActive, Expr::value(active))
            .col_expr(
                bill_of_materials::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(bill_of_materials::Column::HubId.eq(hub_id))
            .filter(bill_of_materials::Column::IsDeleted.eq(false))
            .filter(bill_of_materials::Column::Id.is_in(ids.to_vec()))
            .exec(&*self.db)
            .await
            .map_err(records::db_failure("BillOfMaterials", "bulk_action"))?;

        records::records_updated("BillOfMaterials", hub_id, result.rows_affected);
        info!(%hub_id, %action, affected = result.rows_affected, "BOM bulk action applied");
        Ok(result.rows_affected)
    }
}
