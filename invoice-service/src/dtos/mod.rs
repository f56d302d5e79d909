pub mod invoices;

pub use invoices::{InvoiceListResponse, ListInvoicesParams};
