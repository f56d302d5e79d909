//! Invoice model: the aggregate root produced by the extraction pipeline.

use crate::models::{ConsumptionEntry, EnergyLineItem};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted invoice row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    /// Installation code printed on the bill.
    pub installation: String,
    /// Client code printed on the bill.
    pub client_code: String,
    /// Due date as printed (string form, not validated as a calendar date).
    pub due_date: String,
    /// Derived: sum of the three category values plus the public-lighting
    /// contribution. The printed grand total is not reconciled against this.
    pub total_amount: Decimal,
    pub public_contribution: Decimal,
    /// Fiscal invoice number.
    pub nota_fiscal: String,
    /// `MON/YY` of the most recent consumption-history entry.
    pub reference_month: String,
    /// Tariff band code ("Verde", "Amarela", ...).
    pub band: String,
    /// Display name (the uploaded file name).
    pub name: String,
    /// Storage key of the original document.
    pub path: String,
    pub distributor: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

/// Invoice fields as assembled from a parsed document, before ids exist.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub installation: String,
    pub client_code: String,
    pub due_date: String,
    pub total_amount: Decimal,
    pub public_contribution: Decimal,
    pub nota_fiscal: String,
    pub reference_month: String,
    pub band: String,
    pub name: String,
    pub path: String,
}

/// An invoice together with its owned entities, as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRecord {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub line_items: Vec<EnergyLineItem>,
    pub history: Vec<ConsumptionEntry>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone)]
pub struct ListInvoicesFilter {
    pub initial_date: Option<NaiveDate>,
    pub final_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub company_ids: Option<Vec<Uuid>>,
    pub user_ids: Option<Vec<Uuid>>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListInvoicesFilter {
    fn default() -> Self {
        Self {
            initial_date: None,
            final_date: None,
            min_amount: None,
            max_amount: None,
            company_ids: None,
            user_ids: None,
            page: 1,
            limit: 10,
        }
    }
}
