pub mod health;
pub mod invoices;

pub use health::{health_check, metrics_endpoint};
pub use invoices::{
    delete_invoice, download_invoice, get_invoice, list_invoices, upload_invoice,
};
