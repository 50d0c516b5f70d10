use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Quality-control outcome of a batch. Transitions are unrestricted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "quarantine")]
    Quarantine,
}

impl QualityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending QC",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Quarantine => "Quarantine",
        }
    }
}

/// A production run fulfilling (part of) an order, traceable to its ingredient lots.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manufacturing_batch")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub hub_id: Uuid,
    pub batch_number: String,
    pub production_order_id: Option<Uuid>,
    pub bom_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub quantity_produced: Decimal,
    pub production_date: Option<Date>,
    pub expiry_date: Option<Date>,
    pub quality_status: QualityStatus,
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_order::Entity",
        from = "Column::ProductionOrderId",
        to = "super::production_order::Column::Id",
        on_delete = "SetNull"
    )]
    ProductionOrder,
    #[sea_orm(
        belongs_to = "super::bill_of_materials::Entity",
        from = "Column::BomId",
        to = "super::bill_of_materials::Column::Id",
        on_delete = "SetNull"
    )]
    BillOfMaterials,
    #[sea_orm(has_many = "super::batch_ingredient::Entity")]
    Ingredients,
}

impl Related<super::production_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionOrder.def()
    }
}

impl Related<super::bill_of_materials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillOfMaterials.def()
    }
}

impl Related<super::batch_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredients.def()
    }
}

hub_record!();
