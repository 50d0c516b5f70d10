// Shared list/search/export pipeline and record helpers
pub mod listing;
pub mod records;

// Entity services
pub mod bill_of_materials;
pub mod bom_lines;
pub mod production_batches;
pub mod production_orders;

pub mod dashboard;
