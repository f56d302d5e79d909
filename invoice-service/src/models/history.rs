//! Twelve-month consumption history, stored as one jsonb blob per invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// One month of the consumption-history table printed on the bill.
///
/// Values are kept in the string form they appear in on the document;
/// history entries are display data, not arithmetic inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionEntry {
    /// Abbreviated month name as printed, e.g. "JAN".
    pub month: String,
    /// Two-digit year, e.g. "24".
    pub year: String,
    /// kWh consumed that month.
    pub consumption: String,
}

/// Persisted history row. Entries keep document order: most recent month
/// first, exactly as printed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConsumptionHistory {
    pub history_id: Uuid,
    pub invoice_id: Uuid,
    pub entries: Json<Vec<ConsumptionEntry>>,
    pub created_utc: DateTime<Utc>,
}
