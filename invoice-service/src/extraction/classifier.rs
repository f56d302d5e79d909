//! Best-effort keyword classification of free text into a coarse document
//! type. Used for upload triage only; the extraction pipeline does not
//! depend on the verdict.

/// Sentinel category returned when no keyword matches.
pub const UNKNOWN_CATEGORY: &str = "desconhecido";

/// Categories in declaration order; the first declared wins ties. Multi-word
/// keywords are counted as phrases, single words against the token stream.
const CATEGORIES: &[(&str, &[&str])] = &[("fatura", &["fatura", "tarifa social de energia"])];

pub fn classify(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut best_category = UNKNOWN_CATEGORY;
    let mut max_matches = 0usize;

    for &(category, keywords) in CATEGORIES {
        let mut matches = 0usize;
        for &keyword in keywords {
            if keyword.contains(' ') {
                matches += lowered.matches(keyword).count();
            } else {
                matches += tokens.iter().filter(|&&t| t == keyword).count();
            }
        }
        if matches > max_matches {
            max_matches = matches;
            best_category = category;
        }
    }

    best_category
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keyword_classifies_as_fatura() {
        let text = "FATURA de energia (segunda via da fatura)";
        assert_eq!(classify(text), "fatura");
    }

    #[test]
    fn phrase_keyword_counts() {
        assert_eq!(classify("beneficiário da TARIFA SOCIAL DE ENERGIA"), "fatura");
    }

    #[test]
    fn no_keyword_yields_unknown() {
        assert_eq!(classify("relatório mensal de medição"), UNKNOWN_CATEGORY);
    }

    #[test]
    fn empty_input_yields_unknown() {
        assert_eq!(classify(""), UNKNOWN_CATEGORY);
    }
}
