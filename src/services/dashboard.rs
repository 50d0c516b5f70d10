use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{
        bill_of_materials::Entity as BillOfMaterialsEntity, bom_line::Entity as BomLineEntity,
        production_batch::Entity as ProductionBatchEntity,
        production_order::Entity as ProductionOrderEntity,
    },
    errors::ServiceError,
    services::records,
};
use sea_orm::DatabaseConnection;

/// Live record counts of one hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total_bill_of_materialses: u64,
    pub total_bom_lines: u64,
    pub total_production_orders: u64,
    pub total_production_batches: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn counts(&self, hub_id: Uuid) -> Result<DashboardCounts, ServiceError> {
        let db = &*self.db;
        Ok(DashboardCounts {
            total_bill_of_materialses: records::count::<BillOfMaterialsEntity, _>(db, hub_id)
                .await?,
            total_bom_lines: records::count::<BomLineEntity, _>(db, hub_id).await?,
            total_production_orders: records::count::<ProductionOrderEntity, _>(db, hub_id)
                .await?,
            total_production_batches: records::count::<ProductionBatchEntity, _>(db, hub_id)
                .await?,
        })
    }
}
