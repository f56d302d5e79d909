//! Energy-usage line items, one per tariff category.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The three tariff categories itemized on a CEMIG bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyCategory {
    EnergyElectric,
    EnergyScee,
    CompensatedEnergy,
}

impl EnergyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyCategory::EnergyElectric => "energy_electric",
            EnergyCategory::EnergyScee => "energy_scee",
            EnergyCategory::CompensatedEnergy => "compensated_energy",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "energy_scee" => EnergyCategory::EnergyScee,
            "compensated_energy" => EnergyCategory::CompensatedEnergy,
            _ => EnergyCategory::EnergyElectric,
        }
    }
}

/// Persisted line-item row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnergyLineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub category: String,
    /// kWh, 4 decimals.
    pub quantity: Decimal,
    /// Monetary value, 4 decimals. Negative for compensated/credited energy.
    pub value: Decimal,
    /// Price per kWh, 8 decimals.
    pub unit_price: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Line item as assembled from a parsed document, before ids exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnergyLineItem {
    pub category: EnergyCategory,
    pub quantity: Decimal,
    pub value: Decimal,
    pub unit_price: Decimal,
}
