use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, Order, PaginatorTrait};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::query_builder::Page,
    entities::{
        bill_of_materials::Entity as BillOfMaterialsEntity,
        bom_line::{self, Entity as BomLineEntity},
        SoftDelete,
    },
    errors::ServiceError,
    export::{decimal_cell, ExportFile, ExportFormat},
    forms::{BomLineForm, InputPolicy},
    services::{
        listing::{BulkAction, ListDescriptor, ListParams, ReferenceIds, ReferenceNames},
        records,
    },
};

impl ListDescriptor for BomLineEntity {
    const LABEL: &'static str = "BOMLine";
    const ROUTE: &'static str = "bom_lines";
    const DEFAULT_SORT: &'static str = "bom";
    const EXPORT_STEM: &'static str = "bom_lines";
    const EXPORT_HEADERS: &'static [&'static str] =
        &["BillOfMaterials", "Quantity", "Description", "Unit"];

    fn search_columns() -> Vec<bom_line::Column> {
        vec![bom_line::Column::Description, bom_line::Column::Unit]
    }

    fn sort_column(key: &str) -> Option<bom_line::Column> {
        use bom_line::Column;
        match key {
            "bom" => Some(Column::BomId),
            "quantity" => Some(Column::Quantity),
            "description" => Some(Column::Description),
            "unit" => Some(Column::Unit),
            "created_at" => Some(Column::CreatedAt),
            _ => None,
        }
    }

    fn secondary_order() -> Vec<(bom_line::Column, Order)> {
        vec![(bom_line::Column::CreatedAt, Order::Asc)]
    }

    fn references(model: &bom_line::Model) -> ReferenceIds {
        let mut ids = ReferenceIds::default();
        ids.boms.insert(model.bom_id);
        ids
    }

    fn row(model: &bom_line::Model, refs: &ReferenceNames) -> Vec<String> {
        vec![
            refs.bom(Some(model.bom_id)),
            decimal_cell(model.quantity),
            model.description.clone(),
            model.unit.clone(),
        ]
    }
}

/// Component lines of a bill of materials.
#[derive(Clone)]
pub struct BomLineService {
    db: Arc<DatabaseConnection>,
    policy: InputPolicy,
}

impl BomLineService {
    pub fn new(db: Arc<DatabaseConnection>, policy: InputPolicy) -> Self {
        Self { db, policy }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        hub_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<bom_line::Model>, ServiceError> {
        records::list::<BomLineEntity, _>(&*self.db, hub_id, params).await
    }

    pub async fn rows(
        &self,
        hub_id: Uuid,
        models: &[bom_line::Model],
    ) -> Result<Vec<Vec<String>>, ServiceError> {
        records::rows::<BomLineEntity, _>(&*self.db, hub_id, models).await
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        hub_id: Uuid,
        params: &ListParams,
        format: ExportFormat,
    ) -> Result<ExportFile, ServiceError> {
        records::export::<BomLineEntity, _>(&*self.db, hub_id, params, format).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, hub_id: Uuid, id: Uuid) -> Result<bom_line::Model, ServiceError> {
        records::get::<BomLineEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn get_including_deleted(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<bom_line::Model, ServiceError> {
        records::get_including_deleted::<BomLineEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn list_including_deleted(
        &self,
        hub_id: Uuid,
    ) -> Result<Vec<bom_line::Model>, ServiceError> {
        records::list_including_deleted::<BomLineEntity, _>(&*self.db, hub_id).await
    }

    pub async fn count(&self, hub_id: Uuid) -> Result<u64, ServiceError> {
        records::count::<BomLineEntity, _>(&*self.db, hub_id).await
    }

    /// A line may only point at a live BOM of the same hub.
    async fn ensure_bom(&self, hub_id: Uuid, bom_id: Uuid) -> Result<(), ServiceError> {
        let found = BillOfMaterialsEntity::find_scoped(hub_id, bom_id)
            .count(&*self.db)
            .await
            .map_err(records::db_failure("BOMLine", "ensure_bom"))?;
        if found == 0 {
            warn!(%hub_id, %bom_id, "BOM line references an unknown bill of materials");
            return Err(ServiceError::ValidationError(
                "bom: unknown bill of materials".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, form))]
    pub async fn create(
        &self,
        hub_id: Uuid,
        form: &BomLineForm,
    ) -> Result<bom_line::Model, ServiceError> {
        let input = form.parse(self.policy)?;
        self.ensure_bom(hub_id, input.bom_id).await?;

        let line = bom_line::ActiveModel {
            hub_id: Set(hub_id),
            bom_id: Set(input.bom_id),
            description: Set(input.description),
            quantity: Set(input.quantity),
            unit: Set(input.unit),
            ..Default::default()
        };

        let created = line
            .insert(&*self.db)
            .await
            .map_err(records::db_failure("BOMLine", "create"))?;

        records::record_created("BOMLine", hub_id, created.id);
        Ok(created)
    }

    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        hub_id: Uuid,
        id: Uuid,
        form: &BomLineForm,
    ) -> Result<bom_line::Model, ServiceError> {
        let existing = self.get(hub_id, id).await?;
        let input = form.parse(self.policy)?;
        self.ensure_bom(hub_id, input.bom_id).await?;

        let mut line: bom_line::ActiveModel = existing.into();
        line.bom_id = Set(input.bom_id);
        line.description = Set(input.description);
        line.quantity = Set(input.quantity);
        line.unit = Set(input.unit);

        let updated = line
            .update(&*self.db)
            .await
            .map_err(records::db_failure("BOMLine", "update"))?;

        records::record_updated("BOMLine", hub_id, id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, hub_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        records::soft_delete::<BomLineEntity, _>(&*self.db, hub_id, id).await
    }

    /// Only `delete` applies to lines; other actions change nothing.
    #[instrument(skip(self, ids))]
    pub async fn bulk_action(
        &self,
        hub_id: Uuid,
        ids: &[Uuid],
        action: &str,
    ) -> Result<u64, ServiceError> {
        match BulkAction::from_str(action.trim()) {
            Ok(BulkAction::Delete) => {
                records::soft_delete_many::<BomLineEntity, _>(&*self.db, hub_id, ids).await
            }
            _ => {
                warn!(%hub_id, action, "ignoring unsupported bulk action");
                Ok(0)
            }
        }
    }
}
