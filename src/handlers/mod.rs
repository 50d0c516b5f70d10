pub mod bill_of_materials;
pub mod bom_lines;
pub mod common;
pub mod dashboard;
pub mod production_batches;
pub mod production_orders;

use axum::Router;
use std::sync::Arc;

use crate::{
    db::DbPool,
    forms::InputPolicy,
    services::{
        bill_of_materials::BillOfMaterialsService, bom_lines::BomLineService,
        dashboard::DashboardService, production_batches::ProductionBatchService,
        production_orders::ProductionOrderService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub bill_of_materials: Arc<BillOfMaterialsService>,
    pub bom_lines: Arc<BomLineService>,
    pub production_orders: Arc<ProductionOrderService>,
    pub production_batches: Arc<ProductionBatchService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, policy: InputPolicy) -> Self {
        Self {
            bill_of_materials: Arc::new(BillOfMaterialsService::new(db_pool.clone(), policy)),
            bom_lines: Arc::new(BomLineService::new(db_pool.clone(), policy)),
            production_orders: Arc::new(ProductionOrderService::new(db_pool.clone(), policy)),
            production_batches: Arc::new(ProductionBatchService::new(db_pool.clone(), policy)),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        }
    }
}

/// Every manufacturing route, with its full `/manufacturing/...` path.
pub fn manufacturing_routes() -> Router<AppState> {
    Router::new()
        .merge(dashboard::routes())
        .merge(bill_of_materials::routes("/manufacturing/bom"))
        .merge(bill_of_materials::routes(
            "/manufacturing/bill_of_materialses",
        ))
        .merge(bom_lines::routes())
        .merge(production_orders::routes("/manufacturing/production"))
        .merge(production_orders::routes(
            "/manufacturing/production_orders",
        ))
        .merge(production_batches::routes())
}
