use serde::{Deserialize, Serialize};

use crate::term::TermDays;

/// A user tier bounding loan amounts and available terms.
///
/// Levels are owned by the backend and arrive as camelCase JSON; the
/// engine only reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanLevel {
    pub level_number: u32,
    pub name: String,
    pub min_amount: f64,
    pub max_amount: f64,
    /// Informational level rate as reported by the backend.
    #[serde(default)]
    pub interest_rate: f64,
    /// Terms offered at this level. Empty means every configured term.
    #[serde(default)]
    pub available_terms: Vec<TermDays>,
    /// Completed loans needed before a user reaches this level.
    #[serde(default)]
    pub min_loans_required: u32,
    #[serde(default)]
    pub auto_approval: bool,
}

impl LoanLevel {
    pub fn new(level_number: u32, name: impl Into<String>, min_amount: f64, max_amount: f64) -> Self {
        Self {
            level_number,
            name: name.into(),
            min_amount,
            max_amount,
            interest_rate: 0.0,
            available_terms: Vec::new(),
            min_loans_required: 0,
            auto_approval: false,
        }
    }

    pub fn with_terms(mut self, terms: impl IntoIterator<Item = TermDays>) -> Self {
        self.available_terms = terms.into_iter().collect();
        self
    }

    pub fn with_min_loans_required(mut self, count: u32) -> Self {
        self.min_loans_required = count;
        self
    }

    pub fn offers_term(&self, term: TermDays) -> bool {
        self.available_terms.is_empty() || self.available_terms.contains(&term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_shape() {
        let json = r#"{
            "levelNumber": 2,
            "name": "Silver",
            "minAmount": 100,
            "maxAmount": 5000,
            "interestRate": 2.5,
            "availableTerms": [7, 14],
            "minLoansRequired": 3
        }"#;
        let level: LoanLevel = serde_json::from_str(json).unwrap();
        assert_eq!(level.level_number, 2);
        assert_eq!(level.max_amount, 5000.0);
        assert_eq!(level.available_terms, vec![TermDays::SEVEN, TermDays::FOURTEEN]);
        assert!(!level.auto_approval);
    }

    #[test]
    fn empty_terms_offer_everything() {
        let level = LoanLevel::new(1, "Bronze", 100.0, 1000.0);
        assert!(level.offers_term(TermDays::THIRTY));

        let level = level.with_terms([TermDays::SEVEN]);
        assert!(level.offers_term(TermDays::SEVEN));
        assert!(!level.offers_term(TermDays::THIRTY));
    }
}
