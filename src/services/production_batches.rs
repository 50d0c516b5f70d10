use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, Order, PaginatorTrait,
    QueryFilter,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::query_builder::Page,
    entities::{
        batch_ingredient::{self, Entity as BatchIngredientEntity},
        bill_of_materials::Entity as BillOfMaterialsEntity,
        production_batch::{self, Entity as ProductionBatchEntity},
        production_order::{self, Entity as ProductionOrderEntity},
        SoftDelete,
    },
    errors::ServiceError,
    export::{date_cell, decimal_cell, ExportFile, ExportFormat},
    forms::{BatchIngredientForm, InputPolicy, ProductionBatchForm, ProductionBatchInput},
    services::{
        listing::{
            BulkAction, ListDescriptor, ListParams, ReferenceIds, ReferenceNames, SortDir,
        },
        records,
    },
};

impl ListDescriptor for ProductionBatchEntity {
    const LABEL: &'static str = "ProductionBatch";
    const ROUTE: &'static str = "production_batches";
    const DEFAULT_SORT: &'static str = "production_date";
    const DEFAULT_DIR: SortDir = SortDir::Desc;
    const EXPORT_STEM: &'static str = "production_batches";
    const EXPORT_HEADERS: &'static [&'static str] = &[
        "Batch Number",
        "Production Order",
        "BillOfMaterials",
        "Quantity Produced",
        "Production Date",
        "Expiry Date",
        "Quality Status",
    ];

    fn search_columns() -> Vec<production_batch::Column> {
        vec![
            production_batch::Column::BatchNumber,
            production_batch::Column::QualityStatus,
            production_batch::Column::Notes,
        ]
    }

    fn sort_column(key: &str) -> Option<production_batch::Column> {
        use production_batch::Column;
        match key {
            "production_date" => Some(Column::ProductionDate),
            "batch_number" => Some(Column::BatchNumber),
            "quality_status" => Some(Column::QualityStatus),
            "quantity_produced" => Some(Column::QuantityProduced),
            "expiry_date" => Some(Column::ExpiryDate),
            "created_at" => Some(Column::CreatedAt),
            _ => None,
        }
    }

    fn secondary_order() -> Vec<(production_batch::Column, Order)> {
        vec![(production_batch::Column::CreatedAt, Order::Desc)]
    }

    fn references(model: &production_batch::Model) -> ReferenceIds {
        let mut ids = ReferenceIds::default();
        ids.boms.extend(model.bom_id);
        ids.orders.extend(model.production_order_id);
        ids
    }

    fn row(model: &production_batch::Model, refs: &ReferenceNames) -> Vec<String> {
        vec![
            model.batch_number.clone(),
            refs.order(model.production_order_id),
            refs.bom(model.bom_id),
            decimal_cell(model.quantity_produced),
            date_cell(model.production_date),
            date_cell(model.expiry_date),
            model.quality_status.to_string(),
        ]
    }
}

/// Production batches and the ingredient lots traced into them.
#[derive(Clone)]
pub struct ProductionBatchService {
    db: Arc<DatabaseConnection>,
    policy: InputPolicy,
}

impl ProductionBatchService {
    pub fn new(db: Arc<DatabaseConnection>, policy: InputPolicy) -> Self {
        Self { db, policy }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        hub_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<production_batch::Model>, ServiceError> {
        records::list::<ProductionBatchEntity, _>(&*self.db, hub_id, params).await
    }

    pub async fn rows(
        &self,
        hub_id: Uuid,
        models: &[production_batch::Model],
    ) -> Result<Vec<Vec<String>>, ServiceError> {
        records::rows::<ProductionBatchEntity, _>(&*self.db, hub_id, models).await
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        hub_id: Uuid,
        params: &ListParams,
        format: ExportFormat,
    ) -> Result<ExportFile, ServiceError> {
        records::export::<ProductionBatchEntity, _>(&*self.db, hub_id, params, format).await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<production_batch::Model, ServiceError> {
        records::get::<ProductionBatchEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn get_including_deleted(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<production_batch::Model, ServiceError> {
        records::get_including_deleted::<ProductionBatchEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn list_including_deleted(
        &self,
        hub_id: Uuid,
    ) -> Result<Vec<production_batch::Model>, ServiceError> {
        records::list_including_deleted::<ProductionBatchEntity, _>(&*self.db, hub_id).await
    }

    pub async fn count(&self, hub_id: Uuid) -> Result<u64, ServiceError> {
        records::count::<ProductionBatchEntity, _>(&*self.db, hub_id).await
    }

    async fn live_order(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<production_order::Model>, ServiceError> {
        ProductionOrderEntity::find_scoped(hub_id, order_id)
            .one(&*self.db)
            .await
            .map_err(records::db_failure("ProductionBatch", "order_lookup"))
    }

    /// Checks the references of `input` and fills in the BOM from the order
    /// when none was chosen.
    async fn resolve_references(
        &self,
        hub_id: Uuid,
        input: &mut ProductionBatchInput,
    ) -> Result<(), ServiceError> {
        if let Some(order_id) = input.production_order_id {
            let order = self.live_order(hub_id, order_id).await?.ok_or_else(|| {
                ServiceError::ValidationError("production_order: unknown production order".into())
            })?;
            if input.bom_id.is_none() {
                input.bom_id = order.bom_id;
            }
        }

        if let Some(bom_id) = input.bom_id {
            let found = BillOfMaterialsEntity::find_scoped(hub_id, bom_id)
                .count(&*self.db)
                .await
                .map_err(records::db_failure("ProductionBatch", "bom_lookup"))?;
            if found == 0 {
                return Err(ServiceError::ValidationError(
                    "bom: unknown bill of materials".into(),
                ));
            }
        }
        Ok(())
    }

    async fn insert(
        &self,
        hub_id: Uuid,
        input: ProductionBatchInput,
    ) -> Result<production_batch::Model, ServiceError> {
        let batch = production_batch::ActiveModel {
            hub_id: Set(hub_id),
            batch_number: Set(input.batch_number),
            production_order_id: Set(input.production_order_id),
            bom_id: Set(input.bom_id),
            quantity_produced: Set(input.quantity_produced),
            production_date: Set(input.production_date),
            expiry_date: Set(input.expiry_date),
            quality_status: Set(input.quality_status),
            notes: Set(input.notes),
            ..Default::default()
        };

        let created = batch
            .insert(&*self.db)
            .await
            .map_err(records::db_failure("ProductionBatch", "create"))?;

        records::record_created("ProductionBatch", hub_id, created.id);
        Ok(created)
    }

    #[instrument(skip(self, form))]
    pub async fn create(
        &self,
        hub_id: Uuid,
        form: &ProductionBatchForm,
    ) -> Result<production_batch::Model, ServiceError> {
        let mut input = form.parse(self.policy)?;
        self.resolve_references(hub_id, &mut input).await?;
        self.insert(hub_id, input).await
    }

    /// Adds a batch to a live order; the batch inherits the order's BOM unless one is given.
    #[instrument(skip(self, form))]
    pub async fn create_for_order(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
        form: &ProductionBatchForm,
    ) -> Result<production_batch::Model, ServiceError> {
        let order = self
            .live_order(hub_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::record_not_found("ProductionOrder", order_id))?;

        let mut input = form.parse(self.policy)?;
        input.production_order_id = Some(order.id);
        if input.bom_id.is_none() {
            input.bom_id = order.bom_id;
        }
        self.resolve_references(hub_id, &mut input).await?;
        self.insert(hub_id, input).await
    }

    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        hub_id: Uuid,
        id: Uuid,
        form: &ProductionBatchForm,
    ) -> Result<production_batch::Model, ServiceError> {
        let existing = self.get(hub_id, id).await?;
        let mut input = form.parse(self.policy)?;
        self.resolve_references(hub_id, &mut input).await?;

        let mut batch: production_batch::ActiveModel = existing.into();
        batch.batch_number = Set(input.batch_number);
        batch.production_order_id = Set(input.production_order_id);
        batch.bom_id = Set(input.bom_id);
        batch.quantity_produced = Set(input.quantity_produced);
        batch.production_date = Set(input.production_date);
        batch.expiry_date = Set(input.expiry_date);
        batch.quality_status = Set(input.quality_status);
        batch.notes = Set(input.notes);

        let updated = batch
            .update(&*self.db)
            .await
            .map_err(records::db_failure("ProductionBatch", "update"))?;

        records::record_updated("ProductionBatch", hub_id, id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, hub_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        records::soft_delete::<ProductionBatchEntity, _>(&*self.db, hub_id, id).await
    }

    /// Soft-deletes a batch only if it belongs to `order_id`.
    #[instrument(skip(self))]
    pub async fn delete_for_order(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
        batch_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.batch_of_order(hub_id, order_id, batch_id).await?;
        self.delete(hub_id, batch_id).await
    }

    async fn batch_of_order(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
        batch_id: Uuid,
    ) -> Result<production_batch::Model, ServiceError> {
        let batch = self.get(hub_id, batch_id).await?;
        if batch.production_order_id != Some(order_id) {
            return Err(ServiceError::record_not_found("ProductionBatch", batch_id));
        }
        Ok(batch)
    }

    #[instrument(skip(self, ids))]
    pub async fn bulk_action(
        &self,
        hub_id: Uuid,
        ids: &[Uuid],
        action: &str,
    ) -> Result<u64, ServiceError> {
        match BulkAction::from_str(action.trim()) {
            Ok(BulkAction::Delete) => {
                records::soft_delete_many::<ProductionBatchEntity, _>(&*self.db, hub_id, ids).await
            }
            _ => {
                warn!(%hub_id, action, "ignoring unsupported bulk action");
                Ok(0)
            }
        }
    }

    /// Records an ingredient lot consumed by a batch of `order_id`.
    #[instrument(skip(self, form))]
    pub async fn add_ingredient(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
        batch_id: Uuid,
        form: &BatchIngredientForm,
    ) -> Result<batch_ingredient::Model, ServiceError> {
        self.batch_of_order(hub_id, order_id, batch_id).await?;
        let input = form.parse(self.policy)?;

        let ingredient = batch_ingredient::ActiveModel {
            hub_id: Set(hub_id),
            batch_id: Set(batch_id),
            description: Set(input.description),
            supplier_lot: Set(input.supplier_lot),
            quantity_used: Set(input.quantity_used),
            unit: Set(input.unit),
            ..Default::default()
        };

        let created = ingredient
            .insert(&*self.db)
            .await
            .map_err(records::db_failure("BatchIngredient", "create"))?;

        records::record_created("BatchIngredient", hub_id, created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_ingredient(
        &self,
        hub_id: Uuid,
        order_id: Uuid,
        batch_id: Uuid,
        ingredient_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.batch_of_order(hub_id, order_id, batch_id).await?;

        let result = BatchIngredientEntity::soft_delete_many(hub_id, vec![ingredient_id])
            .filter(batch_ingredient::Column::BatchId.eq(batch_id))
            .exec(&*self.db)
            .await
            .map_err(records::db_failure("BatchIngredient", "soft_delete"))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::record_not_found(
                "BatchIngredient",
                ingredient_id,
            ));
        }

        counter!("manufacturing_records_deleted", 1, "entity" => "BatchIngredient");
        info!(%hub_id, %batch_id, %ingredient_id, "ingredient lot soft-deleted");
        Ok(())
    }
}
