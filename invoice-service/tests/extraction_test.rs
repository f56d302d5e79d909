//! Field extraction and assembly over a representative CEMIG text layer.

use chrono::Utc;
use invoice_service::extraction::{assemble, extract, ExtractionError};
use invoice_service::models::{Company, EnergyCategory, User};
use rust_decimal::Decimal;
use uuid::Uuid;

const BILL_TEXT: &str = "CEMIG DISTRIBUIÇÃO S.A. CNPJ 06.981.180/0001-16

Nº DO CLIENTE
3001116735
Nº DA INSTALAÇÃO 7204076116

Vencimento Valor a pagar
12/02/2024 58,75

Band. Verde

Valores Faturados
Energia ElétricakWh 100,0 0,50250000 50,25
Energia SCEE s/ ICMSkWh 20 0,48000000 10,00
Energia compensada GD IkWh 10 0,50000000 -5,00
Contrib Ilum Publica Municipal 3,50

Histórico de Consumo
Mês Consumo(kWh) Média
JAN/24 506 16,9
DEZ/23 606 19,5
NOV/23 481 16,0
Reservado ao Fisco

NOTA FISCAL Nº 115591996
SÉRIE U
";

fn dec(value: i64, scale: u32) -> Decimal {
    Decimal::new(value, scale)
}

fn test_company() -> Company {
    Company {
        company_id: Uuid::new_v4(),
        name: "Fazenda Boa Vista".to_string(),
        created_utc: Utc::now(),
    }
}

fn test_user() -> User {
    User {
        user_id: Uuid::new_v4(),
        name: "Maria Souza".to_string(),
        role: "customer".to_string(),
        created_utc: Utc::now(),
    }
}

#[test]
fn extracts_all_scalar_fields() {
    let fields = extract(BILL_TEXT).unwrap();

    assert_eq!(fields.installation, "7204076116");
    assert_eq!(fields.client_code, "3001116735");
    assert_eq!(fields.due_date, "12/02/2024");
    assert_eq!(fields.nota_fiscal, "115591996");
    assert_eq!(fields.band, "Verde");
    assert_eq!(fields.public_contribution, dec(350, 2));
}

#[test]
fn extracts_energy_category_rows() {
    let fields = extract(BILL_TEXT).unwrap();

    assert_eq!(fields.energy_electric.quantity, dec(1000, 1));
    assert_eq!(fields.energy_electric.unit_price, dec(50_250_000, 8));
    assert_eq!(fields.energy_electric.value, dec(5025, 2));

    assert_eq!(fields.energy_scee.value, dec(1000, 2));
    assert_eq!(fields.compensated_energy.value, dec(-500, 2));
}

#[test]
fn total_amount_is_derived_from_sub_values() {
    let fields = extract(BILL_TEXT).unwrap();

    // 50.25 + 10.00 - 5.00 + 3.50, independent of any printed total
    assert_eq!(fields.total_amount, dec(5875, 2));
    assert_eq!(
        fields.total_amount,
        fields.energy_electric.value
            + fields.energy_scee.value
            + fields.compensated_energy.value
            + fields.public_contribution
    );
}

#[test]
fn history_preserves_document_order_and_derives_reference_month() {
    let fields = extract(BILL_TEXT).unwrap();

    let months: Vec<(&str, &str, &str)> = fields
        .history
        .iter()
        .map(|e| (e.month.as_str(), e.year.as_str(), e.consumption.as_str()))
        .collect();

    // Reverse-chronological document order, never re-sorted
    assert_eq!(
        months,
        vec![
            ("JAN", "24", "506"),
            ("DEZ", "23", "606"),
            ("NOV", "23", "481"),
        ]
    );
    assert_eq!(fields.reference_month, "JAN/24");
}

#[test]
fn missing_energy_category_defaults_to_zero_without_failing() {
    let text = BILL_TEXT
        .lines()
        .filter(|line| !line.starts_with("Energia SCEE"))
        .collect::<Vec<_>>()
        .join("\n");

    let fields = extract(&text).unwrap();

    assert_eq!(fields.energy_scee.quantity, Decimal::ZERO);
    assert_eq!(fields.energy_scee.value, Decimal::ZERO);
    assert_eq!(fields.energy_scee.unit_price, Decimal::ZERO);
    // 50.25 - 5.00 + 3.50
    assert_eq!(fields.total_amount, dec(4875, 2));
}

#[test]
fn missing_public_contribution_defaults_to_zero() {
    let text = BILL_TEXT
        .lines()
        .filter(|line| !line.starts_with("Contrib Ilum"))
        .collect::<Vec<_>>()
        .join("\n");

    let fields = extract(&text).unwrap();

    assert_eq!(fields.public_contribution, Decimal::ZERO);
    assert_eq!(fields.total_amount, dec(5525, 2));
}

#[test]
fn missing_mandatory_field_names_the_field() {
    let text = BILL_TEXT.replace("NOTA FISCAL Nº 115591996", "");

    let err = extract(&text).unwrap_err();

    assert_eq!(err, ExtractionError::FieldNotFound("nota_fiscal"));
    assert!(err.to_string().contains("nota_fiscal"));
}

#[test]
fn empty_history_is_a_missing_reference_month() {
    let text = BILL_TEXT.replace("Histórico de Consumo", "Outra Seção");

    let err = extract(&text).unwrap_err();

    assert_eq!(err, ExtractionError::FieldNotFound("reference_month"));
}

#[test]
fn first_band_match_wins() {
    let text = format!("{}\nBand. Amarela\n", BILL_TEXT);

    let fields = extract(&text).unwrap();

    assert_eq!(fields.band, "Verde");
}

#[test]
fn assembles_full_aggregate_with_one_item_per_category() {
    let company = test_company();
    let user = test_user();
    let fields = extract(BILL_TEXT).unwrap();

    let aggregate = assemble(fields, &company, &user, "fatura_jan_2024.pdf", "abc/def.pdf");

    assert_eq!(aggregate.invoice.company_id, company.company_id);
    assert_eq!(aggregate.invoice.user_id, user.user_id);
    assert_eq!(aggregate.invoice.total_amount, dec(5875, 2));
    assert_eq!(aggregate.invoice.reference_month, "JAN/24");
    assert_eq!(aggregate.invoice.name, "fatura_jan_2024.pdf");
    assert_eq!(aggregate.invoice.path, "abc/def.pdf");

    assert_eq!(aggregate.line_items.len(), 3);
    let categories: Vec<EnergyCategory> =
        aggregate.line_items.iter().map(|i| i.category).collect();
    assert_eq!(
        categories,
        vec![
            EnergyCategory::EnergyElectric,
            EnergyCategory::EnergyScee,
            EnergyCategory::CompensatedEnergy,
        ]
    );
    assert_eq!(aggregate.line_items[0].quantity, dec(1000, 1));
    assert_eq!(aggregate.line_items[2].value, dec(-500, 2));

    assert_eq!(aggregate.history.len(), 3);
    assert_eq!(aggregate.history[0].month, "JAN");
}
