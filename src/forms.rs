//! Form bodies for the add/edit endpoints.
//!
//! Bodies arrive as `application/x-www-form-urlencoded` with every field as
//! text; missing fields deserialize as empty strings. Each form parses into a
//! typed input under an [`InputPolicy`]: strict policies reject malformed
//! decimal, date, choice or id text, lenient ones fall back to the field default.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{production_batch::QualityStatus, production_order::ProductionStatus};
use crate::errors::ServiceError;

/// Largest magnitude a `DECIMAL(10, 2)` column holds.
const DECIMAL_LIMIT: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPolicy {
    pub strict: bool,
}

impl InputPolicy {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }

    fn reject_or<T>(&self, field: &str, raw: &str, fallback: T) -> Result<T, ServiceError> {
        if self.strict {
            Err(ServiceError::InvalidInput(format!(
                "{}: '{}' is not a valid value",
                field, raw
            )))
        } else {
            warn!(field, value = raw, "coercing malformed input to default");
            Ok(fallback)
        }
    }

    /// Empty text is `default`; values are rounded half away from zero to two
    /// places before the column limit is checked.
    pub fn decimal(&self, field: &str, raw: &str, default: Decimal) -> Result<Decimal, ServiceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(default);
        }
        match Decimal::from_str(raw).map(round_cents) {
            Ok(value) if value.abs() < Decimal::from(DECIMAL_LIMIT) => Ok(value),
            _ => self.reject_or(field, raw, default),
        }
    }

    /// ISO `YYYY-MM-DD`; empty text is no date.
    pub fn date(&self, field: &str, raw: &str) -> Result<Option<NaiveDate>, ServiceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Ok(Some(date)),
            Err(_) => self.reject_or(field, raw, None),
        }
    }

    pub fn choice<T>(&self, field: &str, raw: &str) -> Result<T, ServiceError>
    where
        T: FromStr + Default,
    {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(T::default());
        }
        match T::from_str(raw) {
            Ok(value) => Ok(value),
            Err(_) => self.reject_or(field, raw, T::default()),
        }
    }

    /// Optional reference to another record; empty text is no reference.
    pub fn reference(&self, field: &str, raw: &str) -> Result<Option<Uuid>, ServiceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match Uuid::parse_str(raw) {
            Ok(id) => Ok(Some(id)),
            Err(_) => self.reject_or(field, raw, None),
        }
    }
}

/// Two places, half away from zero, as a `NUMERIC(10, 2)` column stores it.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// HTML checkbox semantics: only `on` is checked.
pub fn checkbox(raw: Option<&str>) -> bool {
    raw == Some("on")
}

fn validated<T: Validate>(input: T) -> Result<T, ServiceError> {
    input.validate()?;
    Ok(input)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BillOfMaterialsForm {
    pub name: String,
    pub code: String,
    pub output_quantity: String,
    pub notes: String,
    pub is_active: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BillOfMaterialsInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 50))]
    pub code: String,
    pub output_quantity: Decimal,
    pub notes: String,
    pub is_active: bool,
}

impl BillOfMaterialsForm {
    pub fn parse(&self, policy: InputPolicy) -> Result<BillOfMaterialsInput, ServiceError> {
        validated(BillOfMaterialsInput {
            name: self.name.trim().to_string(),
            code: self.code.trim().to_string(),
            output_quantity: policy.decimal(
                "output_quantity",
                &self.output_quantity,
                Decimal::ZERO,
            )?,
            notes: self.notes.trim().to_string(),
            is_active: checkbox(self.is_active.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BomLineForm {
    pub bom: String,
    pub description: String,
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BomLineInput {
    pub bom_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    pub quantity: Decimal,
    #[validate(length(max = 20))]
    pub unit: String,
}

impl BomLineForm {
    pub fn parse(&self, policy: InputPolicy) -> Result<BomLineInput, ServiceError> {
        // A line cannot exist without its bill of materials, whatever the policy.
        let bom_id = Uuid::parse_str(self.bom.trim()).map_err(|_| {
            ServiceError::ValidationError("bom: a bill of materials is required".to_string())
        })?;

        validated(BomLineInput {
            bom_id,
            description: self.description.trim().to_string(),
            quantity: policy.decimal("quantity", &self.quantity, Decimal::ZERO)?,
            unit: self.unit.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductionOrderForm {
    pub order_number: String,
    pub bom: String,
    pub quantity: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub notes: String,
    pub batch_number: String,
    pub expiry_date: String,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductionOrderInput {
    #[validate(length(min = 1, max = 50))]
    pub order_number: String,
    pub bom_id: Option<Uuid>,
    pub quantity: Decimal,
    pub status: ProductionStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: String,
    #[validate(length(max = 50))]
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
}

impl ProductionOrderForm {
    pub fn parse(&self, policy: InputPolicy) -> Result<ProductionOrderInput, ServiceError> {
        validated(ProductionOrderInput {
            order_number: self.order_number.trim().to_string(),
            bom_id: policy.reference("bom", &self.bom)?,
            quantity: policy.decimal("quantity", &self.quantity, Decimal::ZERO)?,
            status: policy.choice("status", &self.status)?,
            start_date: policy.date("start_date", &self.start_date)?,
            end_date: policy.date("end_date", &self.end_date)?,
            notes: self.notes.trim().to_string(),
            batch_number: self.batch_number.trim().to_string(),
            expiry_date: policy.date("expiry_date", &self.expiry_date)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductionBatchForm {
    pub batch_number: String,
    pub production_order: String,
    pub bom: String,
    pub quantity_produced: String,
    pub production_date: String,
    pub expiry_date: String,
    pub quality_status: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductionBatchInput {
    #[validate(length(min = 1, max = 50))]
    pub batch_number: String,
    pub production_order_id: Option<Uuid>,
    pub bom_id: Option<Uuid>,
    pub quantity_produced: Decimal,
    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub quality_status: QualityStatus,
    pub notes: String,
}

impl ProductionBatchForm {
    pub fn parse(&self, policy: InputPolicy) -> Result<ProductionBatchInput, ServiceError> {
        validated(ProductionBatchInput {
            batch_number: self.batch_number.trim().to_string(),
            production_order_id: policy.reference("production_order", &self.production_order)?,
            bom_id: policy.reference("bom", &self.bom)?,
            quantity_produced: policy.decimal(
                "quantity_produced",
                &self.quantity_produced,
                Decimal::ZERO,
            )?,
            production_date: policy.date("production_date", &self.production_date)?,
            expiry_date: policy.date("expiry_date", &self.expiry_date)?,
            quality_status: policy.choice("quality_status", &self.quality_status)?,
            notes: self.notes.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchIngredientForm {
    pub description: String,
    pub supplier_lot: String,
    pub quantity_used: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct BatchIngredientInput {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(length(max = 100))]
    pub supplier_lot: String,
    pub quantity_used: Decimal,
    #[validate(length(max = 20))]
    pub unit: String,
}

impl BatchIngredientForm {
    pub fn parse(&self, policy: InputPolicy) -> Result<BatchIngredientInput, ServiceError> {
        validated(BatchIngredientInput {
            description: self.description.trim().to_string(),
            supplier_lot: self.supplier_lot.trim().to_string(),
            quantity_used: policy.decimal("quantity_used", &self.quantity_used, Decimal::ZERO)?,
            unit: self.unit.trim().to_string(),
        })
    }
}

/// Comma-separated record ids from a bulk form. Malformed entries are skipped.
pub fn parse_id_list(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match Uuid::parse_str(part) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = part, "skipping malformed id in bulk request");
                None
            }
        })
        .collect()
}

/// A bulk request body. Checked table rows post one `ids` pair each; a
/// single comma-separated `ids` value is accepted too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkForm {
    pub ids: Vec<Uuid>,
    pub action: String,
}

impl BulkForm {
    pub fn from_body(body: &[u8]) -> Self {
        let mut form = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "ids" => form.ids.extend(parse_id_list(&value)),
                "action" => form.action = value.trim().to_string(),
                _ => {}
            }
        }
        form
    }
}
