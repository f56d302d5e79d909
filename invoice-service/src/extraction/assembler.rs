//! Assembly of extracted values into the invoice aggregate.
//!
//! No I/O happens here. Identifiers are not assigned either: the unit of
//! work generates them when the aggregate is persisted. Mandatory-field
//! absence is unrepresentable at this point, because `extract` already
//! rejected the document.

use crate::extraction::fields::RawFields;
use crate::models::{Company, ConsumptionEntry, EnergyCategory, NewEnergyLineItem, NewInvoice, User};

/// The four-entity aggregate built from one parsed document: invoice fields,
/// one line item per tariff category, and the consumption history.
#[derive(Debug, Clone)]
pub struct InvoiceAggregate {
    pub invoice: NewInvoice,
    pub line_items: Vec<NewEnergyLineItem>,
    pub history: Vec<ConsumptionEntry>,
}

pub fn assemble(
    fields: RawFields,
    company: &Company,
    user: &User,
    file_name: &str,
    storage_key: &str,
) -> InvoiceAggregate {
    let line_items = vec![
        NewEnergyLineItem {
            category: EnergyCategory::EnergyElectric,
            quantity: fields.energy_electric.quantity,
            value: fields.energy_electric.value,
            unit_price: fields.energy_electric.unit_price,
        },
        NewEnergyLineItem {
            category: EnergyCategory::EnergyScee,
            quantity: fields.energy_scee.quantity,
            value: fields.energy_scee.value,
            unit_price: fields.energy_scee.unit_price,
        },
        NewEnergyLineItem {
            category: EnergyCategory::CompensatedEnergy,
            quantity: fields.compensated_energy.quantity,
            value: fields.compensated_energy.value,
            unit_price: fields.compensated_energy.unit_price,
        },
    ];

    InvoiceAggregate {
        invoice: NewInvoice {
            company_id: company.company_id,
            user_id: user.user_id,
            installation: fields.installation,
            client_code: fields.client_code,
            due_date: fields.due_date,
            total_amount: fields.total_amount,
            public_contribution: fields.public_contribution,
            nota_fiscal: fields.nota_fiscal,
            reference_month: fields.reference_month,
            band: fields.band,
            name: file_name.to_string(),
            path: storage_key.to_string(),
        },
        line_items,
        history: fields.history,
    }
}
