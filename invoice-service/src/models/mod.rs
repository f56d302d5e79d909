//! Domain models for invoice-service.

mod company;
mod energy;
mod history;
mod invoice;
mod user;

pub use company::Company;
pub use energy::{EnergyCategory, EnergyLineItem, NewEnergyLineItem};
pub use history::{ConsumptionEntry, ConsumptionHistory};
pub use invoice::{Invoice, InvoiceRecord, ListInvoicesFilter, NewInvoice};
pub use user::{User, UserRole};
