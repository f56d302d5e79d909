//! Field extraction over the CEMIG bill layout.
//!
//! Pure and deterministic: an ordered table of named pattern rules is applied
//! once over the acquired text. Administrative identifiers are mandatory and
//! fail the whole extraction when absent; monetary sub-fields degrade to zero
//! independently, since partial energy-category data is common (a month
//! without compensated energy, for instance). Supporting a second distributor
//! layout means swapping these rule tables, not rewriting control flow.

use crate::extraction::error::ExtractionError;
use crate::models::{ConsumptionEntry, EnergyCategory};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// The three numeric columns of one energy-category row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnergyReading {
    pub quantity: Decimal,
    pub value: Decimal,
    pub unit_price: Decimal,
}

/// Flat bag of typed values pulled from one document.
#[derive(Debug, Clone)]
pub struct RawFields {
    pub installation: String,
    pub client_code: String,
    pub due_date: String,
    pub nota_fiscal: String,
    pub band: String,
    pub public_contribution: Decimal,
    pub energy_electric: EnergyReading,
    pub energy_scee: EnergyReading,
    pub compensated_energy: EnergyReading,
    /// Document order: most recent month first. Not re-sorted.
    pub history: Vec<ConsumptionEntry>,
    /// Derived from history entry 0, `MON/YY`.
    pub reference_month: String,
    /// Derived: category values + public contribution.
    pub total_amount: Decimal,
}

struct ScalarRule {
    name: &'static str,
    required: bool,
    regex: Regex,
}

impl ScalarRule {
    fn new(name: &'static str, required: bool, pattern: &str) -> Self {
        Self {
            name,
            required,
            regex: Regex::new(pattern).expect("invalid scalar field pattern"),
        }
    }

    /// First match wins; patterns are anchored to unique section headers, so
    /// a second match would be a layout-mismatch bug.
    fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }
}

static SCALAR_RULES: Lazy<Vec<ScalarRule>> = Lazy::new(|| {
    vec![
        ScalarRule::new("installation", true, r"Nº DA INSTALAÇÃO\s+(\d+)"),
        ScalarRule::new("client_code", true, r"Nº DO CLIENTE[\s\S]*?(\d+)\n"),
        ScalarRule::new("band", true, r"Band\. (\w+)"),
        ScalarRule::new("due_date", true, r"Valor a pagar[\s\S]*?(\d+\S+\D+\d+)\s"),
        ScalarRule::new("nota_fiscal", true, r"NOTA FISCAL Nº\s+(\d+)"),
        ScalarRule::new(
            "public_contribution",
            false,
            r"Contrib Ilum Publica Municipal\s+(\d+\D+\d+)",
        ),
    ]
});

/// Quantity, unit price and value columns of one category row, in the order
/// they are printed.
static ENERGY_RULES: Lazy<Vec<(EnergyCategory, Regex)>> = Lazy::new(|| {
    let row = |label: &str| {
        Regex::new(&format!(r"{label}\s+([\d,.]+)\s+([\d,.]+)\s+(-?[\d,.]+)"))
            .expect("invalid energy row pattern")
    };
    vec![
        (EnergyCategory::EnergyElectric, row("Energia ElétricakWh")),
        (EnergyCategory::EnergyScee, row("Energia SCEE s/ ICMSkWh")),
        (
            EnergyCategory::CompensatedEnergy,
            row("Energia compensada GD IkWh"),
        ),
    ]
});

static HISTORY_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Histórico de Consumo.*?Reservado ao Fisco")
        .expect("invalid history block pattern")
});

/// Normalize a Brazilian-locale numeric string: `.` separates thousands,
/// `,` is the decimal mark. `"1.234,56"` parses to `1234.56`.
fn parse_decimal(raw: &str) -> Decimal {
    let normalized = raw.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

fn extract_energy(text: &str, regex: &Regex) -> EnergyReading {
    match regex.captures(text) {
        Some(caps) => EnergyReading {
            quantity: caps.get(1).map_or(Decimal::ZERO, |m| parse_decimal(m.as_str())),
            unit_price: caps.get(2).map_or(Decimal::ZERO, |m| parse_decimal(m.as_str())),
            value: caps.get(3).map_or(Decimal::ZERO, |m| parse_decimal(m.as_str())),
        },
        None => EnergyReading::default(),
    }
}

/// The consumption-history table sits between its section header and the tax
/// reserve footer. Two header lines are skipped; a line counts as an entry
/// when its first token is a `MON/YY` pair followed by the consumption value.
/// Anything else inside the block (stray whitespace, footer text) is skipped.
fn extract_history(text: &str) -> Vec<ConsumptionEntry> {
    let Some(block) = HISTORY_BLOCK.find(text) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for line in block.as_str().trim().lines().skip(2) {
        let line = line.trim();
        if line.is_empty() || line.contains("Reservado ao Fisco") {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(month_year), Some(consumption)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Some((month, year)) = month_year.split_once('/') {
            entries.push(ConsumptionEntry {
                month: month.to_string(),
                year: year.to_string(),
                consumption: consumption.to_string(),
            });
        }
    }
    entries
}

/// Apply the rule tables to the document text.
///
/// Missing mandatory fields abort with the field name; optional monetary
/// sub-fields default to zero independently.
pub fn extract(text: &str) -> Result<RawFields, ExtractionError> {
    let mut installation = String::new();
    let mut client_code = String::new();
    let mut band = String::new();
    let mut due_date = String::new();
    let mut nota_fiscal = String::new();
    let mut public_contribution = Decimal::ZERO;

    for rule in SCALAR_RULES.iter() {
        match rule.capture(text) {
            Some(value) => match rule.name {
                "installation" => installation = value.to_string(),
                "client_code" => client_code = value.to_string(),
                "band" => band = value.to_string(),
                "due_date" => due_date = value.to_string(),
                "nota_fiscal" => nota_fiscal = value.to_string(),
                "public_contribution" => public_contribution = parse_decimal(value),
                _ => unreachable!("unknown scalar rule"),
            },
            None if rule.required => return Err(ExtractionError::FieldNotFound(rule.name)),
            None => {}
        }
    }

    let mut readings = ENERGY_RULES
        .iter()
        .map(|(_, regex)| extract_energy(text, regex));
    let energy_electric = readings.next().unwrap_or_default();
    let energy_scee = readings.next().unwrap_or_default();
    let compensated_energy = readings.next().unwrap_or_default();

    let history = extract_history(text);
    let reference_month = history
        .first()
        .map(|entry| format!("{}/{}", entry.month, entry.year))
        .ok_or(ExtractionError::FieldNotFound("reference_month"))?;

    let total_amount =
        energy_electric.value + energy_scee.value + compensated_energy.value + public_contribution;

    Ok(RawFields {
        installation,
        client_code,
        due_date,
        nota_fiscal,
        band,
        public_contribution,
        energy_electric,
        energy_scee,
        compensated_energy,
        history,
        reference_month,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_brazilian_locale() {
        assert_eq!(parse_decimal("1.234,56"), Decimal::new(123456, 2));
        assert_eq!(parse_decimal("50,25"), Decimal::new(5025, 2));
        assert_eq!(parse_decimal("-5,00"), Decimal::new(-500, 2));
        assert_eq!(parse_decimal("0,50250000"), Decimal::new(50250000, 8));
        assert_eq!(parse_decimal("506"), Decimal::new(506, 0));
    }

    #[test]
    fn parse_decimal_garbage_defaults_to_zero() {
        assert_eq!(parse_decimal("n/a"), Decimal::ZERO);
        assert_eq!(parse_decimal(""), Decimal::ZERO);
    }

    #[test]
    fn history_lines_without_month_year_token_are_skipped() {
        let text = "Histórico de Consumo\nMês Consumo kWh\ncabeçalho\nJAN/24 506 15,2\nrodapé solto\nDEZ/23 606 19,5\nReservado ao Fisco";
        let history = extract_history(text);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].month, "JAN");
        assert_eq!(history[1].consumption, "606");
    }

    #[test]
    fn history_block_missing_yields_empty() {
        assert!(extract_history("sem tabela nenhuma").is_empty());
    }
}
