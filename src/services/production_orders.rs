use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, Order, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::query_builder::Page,
    entities::{
        batch_ingredient::{self, Entity as BatchIngredientEntity},
        bill_of_materials::{self, Entity as BillOfMaterialsEntity},
        production_batch::{self, Entity as ProductionBatchEntity},
        production_order::{self, Entity as ProductionOrderEntity},
        SoftDelete,
    },
    errors::ServiceError,
    export::{date_cell, decimal_cell, ExportFile, ExportFormat},
    forms::{InputPolicy, ProductionOrderForm},
    services::{
        listing::{BulkAction, ListDescriptor, ListParams, ReferenceIds, ReferenceNames},
        records,
    },
};

impl ListDescriptor for ProductionOrderEntity {
    const LABEL: &'static str = "ProductionOrder";
    const ROUTE: &'static str = "production_orders";
    const DEFAULT_SORT: &'static str = "order_number";
    const EXPORT_STEM: &'static str = "production_orders";
    const EXPORT_HEADERS: &'static [&'static str] = &[
        "Order Number",
        "BillOfMaterials",
        "Status",
        "Quantity",
        "Start Date",
        "End Date",
    ];

    fn search_columns() -> Vec<production_order::Column> {
        vec![
            production_order::Column::OrderNumber,
            production_order::Column::Status,
            production_order::Column::Notes,
        ]
    }

    fn sort_column(key: &str) -> Option<production_order::Column> {
        use production_order::Column;
        match key {
            "order_number" => Some(Column::OrderNumber),
            "bom" => Some(Column::BomId),
            "status" => Some(Column::Status),
            "quantity" => Some(Column::Quantity),
            "start_date" => Some(Column::StartDate),
            "end_date" => Some(Column::EndDate),
            "created_at" => Some(Column::CreatedAt),
            _ => None,
        }
    }

    fn references(model: &production_order::Model) -> ReferenceIds {
        let mut ids = ReferenceIds::default();
        ids.boms.extend(model.bom_id);
        ids
    }

    fn row(model: &production_order::Model, refs: &ReferenceNames) -> Vec<String> {
        vec![
            model.order_number.clone(),
            refs.bom(model.bom_id),
            model.status.to_string(),
            decimal_cell(model.quantity),
            date_cell(model.start_date),
            date_cell(model.end_date),
        ]
    }
}

/// A batch of an order together with the ingredient lots it consumed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchWithIngredients {
    #[serde(flatten)]
    pub batch: production_batch::Model,
    pub ingredients: Vec<batch_ingredient::Model>,
}

/// Everything the production order detail view shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProductionOrderDetail {
    pub order: production_order::Model,
    pub bom: Option<bill_of_materials::Model>,
    pub batches: Vec<BatchWithIngredients>,
}

#[derive(Clone)]
pub struct ProductionOrderService {
    db: Arc<DatabaseConnection>,
    policy: InputPolicy,
}

impl ProductionOrderService {
    pub fn new(db: Arc<DatabaseConnection>, policy: InputPolicy) -> Self {
        Self { db, policy }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        hub_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<production_order::Model>, ServiceError> {
        records::list::<ProductionOrderEntity, _>(&*self.db, hub_id, params).await
    }

    pub async fn rows(
        &self,
        hub_id: Uuid,
        models: &[production_order::Model],
    ) -> Result<Vec<Vec<String>>, ServiceError> {
        records::rows::<ProductionOrderEntity, _>(&*self.db, hub_id, models).await
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        hub_id: Uuid,
        params: &ListParams,
        format: ExportFormat,
    ) -> Result<ExportFile, ServiceError> {
        records::export::<ProductionOrderEntity, _>(&*self.db, hub_id, params, format).await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        records::get::<ProductionOrderEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn get_including_deleted(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<production_order::Model, ServiceError> {
        records::get_including_deleted::<ProductionOrderEntity, _>(&*self.db, hub_id, id).await
    }

    pub async fn list_including_deleted(
        &self,
        hub_id: Uuid,
    ) -> Result<Vec<production_order::Model>, ServiceError> {
        records::list_including_deleted::<ProductionOrderEntity, _>(&*self.db, hub_id).await
    }

    pub async fn count(&self, hub_id: Uuid) -> Result<u64, ServiceError> {
        records::count::<ProductionOrderEntity, _>(&*self.db, hub_id).await
    }

    /// `(id, order_number)` of the live orders of this hub, for select inputs.
    pub async fn choices(&self, hub_id: Uuid) -> Result<Vec<(Uuid, String)>, ServiceError> {
        let orders = ProductionOrderEntity::scoped(hub_id)
            .order_by(production_order::Column::OrderNumber, Order::Asc)
            .all(&*self.db)
            .await
            .map_err(records::db_failure("ProductionOrder", "choices"))?;
        Ok(orders
            .into_iter()
            .map(|order| (order.id, order.order_number))
            .collect())
    }

    async fn ensure_bom(&self, hub_id: Uuid, bom_id: Option<Uuid>) -> Result<(), ServiceError> {
        let Some(bom_id) = bom_id else {
            return Ok(());
        };
        let found = BillOfMaterialsEntity::find_scoped(hub_id, bom_id)
            .count(&*self.db)
            .await
            .map_err(records::db_failure("ProductionOrder", "ensure_bom"))?;
        if found == 0 {
            warn!(%hub_id, %bom_id, "production order references an unknown bill of materials");
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
        form: &ProductionOrderForm,
    ) -> Result<production_order::Model, ServiceError> {
        let input = form.parse(self.policy)?;
        self.ensure_bom(hub_id, input.bom_id).await?;

        let order = production_order::ActiveModel {
            hub_id: Set(hub_id),
            order_number: Set(input.order_number),
            bom_id: Set(input.bom_id),
            quantity: Set(input.quantity),
            status: Set(input.status),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            notes: Set(input.notes),
            batch_number: Set(input.batch_number),
            expiry_date: Set(input.expiry_date),
            ..Default::default()
        };

        let created = order
            .insert(&*self.db)
            .await
            .map_err(records::db_failure("ProductionOrder", "create"))?;

        records::record_created("ProductionOrder", hub_id, created.id);
        Ok(created)
    }

    #[instrument(skip(self, form))]
    pub async fn update(
        &self,
        hub_id: Uuid,
        id: Uuid,
        form: &ProductionOrderForm,
    ) -> Result<production_order::Model, ServiceError> {
        let existing = self.get(hub_id, id).await?;
        let input = form.parse(self.policy)?;
        self.ensure_bom(hub_id, input.bom_id).await?;

        let mut order: production_order::ActiveModel = existing.into();
        order.order_number = Set(input.order_number);
        order.bom_id = Set(input.bom_id);
        order.quantity = Set(input.quantity);
        order.status = Set(input.status);
        order.start_date = Set(input.start_date);
        order.end_date = Set(input.end_date);
        order.notes = Set(input.notes);
        order.batch_number = Set(input.batch_number);
        order.expiry_date = Set(input.expiry_date);

        let updated = order
            .update(&*self.db)
            .await
            .map_err(records::db_failure("ProductionOrder", "update"))?;

        records::record_updated("ProductionOrder", hub_id, id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, hub_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        records::soft_delete::<ProductionOrderEntity, _>(&*self.db, hub_id, id).await
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
                records::soft_delete_many::<ProductionOrderEntity, _>(&*self.db, hub_id, ids).await
            }
            _ => {
                warn!(%hub_id, action, "ignoring unsupported bulk action");
                Ok(0)
            }
        }
    }

    /// The order, its BOM and its live batches (newest production first), each
    /// with its live ingredient lots.
    #[instrument(skip(self))]
    pub async fn detail(
        &self,
        hub_id: Uuid,
        id: Uuid,
    ) -> Result<ProductionOrderDetail, ServiceError> {
        let db = &*self.db;
        let order = self.get(hub_id, id).await?;

        let bom = match order.bom_id {
            Some(bom_id) => BillOfMaterialsEntity::find_including_deleted(hub_id, bom_id)
                .one(db)
                .await
                .map_err(records::db_failure("ProductionOrder", "detail_bom"))?,
            None => None,
        };

        let batches = ProductionBatchEntity::scoped(hub_id)
            .filter(production_batch::Column::ProductionOrderId.eq(id))
            .order_by(production_batch::Column::ProductionDate, Order::Desc)
            .order_by(production_batch::Column::CreatedAt, Order::Desc)
            .all(db)
            .await
            .map_err(records::db_failure("ProductionOrder", "detail_batches"))?;

        let batch_ids: Vec<Uuid> = batches.iter().map(|batch| batch.id).collect();
        let mut ingredients: HashMap<Uuid, Vec<batch_ingredient::Model>> = HashMap::new();
        if !batch_ids.is_empty() {
            let rows = BatchIngredientEntity::scoped(hub_id)
                .filter(batch_ingredient::Column::BatchId.is_in(batch_ids))
                .order_by(batch_ingredient::Column::CreatedAt, Order::Asc)
                .all(db)
                .await
                .map_err(records::db_failure("ProductionOrder", "detail_ingredients"))?;
            for ingredient in rows {
                ingredients
                    .entry(ingredient.batch_id)
                    .or_default()
                    .push(ingredient);
            }
        }

        let batches = batches
            .into_iter()
            .map(|batch| BatchWithIngredients {
                ingredients: ingredients.remove(&batch.id).unwrap_or_default(),
                batch,
            })
            .collect();

        Ok(ProductionOrderDetail {
            order,
            bom,
            batches,
        })
    }
}
