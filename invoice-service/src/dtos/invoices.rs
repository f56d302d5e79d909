use crate::models::Invoice;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Query parameters for the invoice listing. Id lists arrive as
/// comma-separated values.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesParams {
    pub initial_date: Option<NaiveDate>,
    pub final_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub company_ids: Option<String>,
    pub user_ids: Option<String>,
}

/// Paginated listing envelope.
#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_per_page: i64,
    pub total_items: i64,
    pub list: Vec<Invoice>,
}
