//! Rate tables: per-term interest and fee percentages.
//!
//! The canonical policy starts from fixed base fee rates and an interest
//! rate selected by term, then scales the three non-interest rates so the
//! total lands on a per-term target (22% / 26% / 30%). Backend-supplied
//! tables carry no target and are applied as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LendingError, LendingResult};
use crate::term::TermDays;

/// Unscaled base service fee, percent of principal.
pub const BASE_SERVICE_FEE_RATE_PCT: f64 = 20.0;
/// Unscaled base administration fee, percent of principal.
pub const BASE_ADMIN_FEE_RATE_PCT: f64 = 10.0;
/// Unscaled base commitment fee, percent of principal.
pub const BASE_COMMITMENT_FEE_RATE_PCT: f64 = 6.0;

/// Policy interest rate for a canonical term.
pub fn canonical_interest_rate_pct(term: TermDays) -> Option<f64> {
    match term.days() {
        7 => Some(1.0),
        14 => Some(2.0),
        30 => Some(4.0),
        _ => None,
    }
}

/// Policy total fee rate (interest included) for a canonical term.
pub fn canonical_target_total_pct(term: TermDays) -> Option<f64> {
    match term.days() {
        7 => Some(22.0),
        14 => Some(26.0),
        30 => Some(30.0),
        _ => None,
    }
}

/// Interest and fee rates for one term, as percentages of principal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermRates {
    pub interest_rate_pct: f64,
    pub service_fee_rate_pct: f64,
    pub admin_fee_rate_pct: f64,
    pub commitment_fee_rate_pct: f64,
    /// Fixed administration charge in currency units, added on top of the
    /// percentage-based admin fee.
    #[serde(default)]
    pub admin_fee_flat: f64,
    /// When set, the three non-interest rates are scaled uniformly so that
    /// their sum plus interest equals this total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_total_pct: Option<f64>,
}

impl TermRates {
    /// Rates used exactly as given.
    pub fn unscaled(
        interest_rate_pct: f64,
        service_fee_rate_pct: f64,
        admin_fee_rate_pct: f64,
        commitment_fee_rate_pct: f64,
    ) -> Self {
        Self {
            interest_rate_pct,
            service_fee_rate_pct,
            admin_fee_rate_pct,
            commitment_fee_rate_pct,
            admin_fee_flat: 0.0,
            target_total_pct: None,
        }
    }

    /// Built-in policy rates for 7, 14, and 30 day terms.
    pub fn canonical(term: TermDays) -> Option<Self> {
        let interest = canonical_interest_rate_pct(term)?;
        let target = canonical_target_total_pct(term)?;
        Some(
            Self::unscaled(
                interest,
                BASE_SERVICE_FEE_RATE_PCT,
                BASE_ADMIN_FEE_RATE_PCT,
                BASE_COMMITMENT_FEE_RATE_PCT,
            )
            .with_target_total_pct(target),
        )
    }

    pub fn with_target_total_pct(mut self, target: f64) -> Self {
        self.target_total_pct = Some(target);
        self
    }

    pub fn with_admin_fee_flat(mut self, amount: f64) -> Self {
        self.admin_fee_flat = amount;
        self
    }

    /// Sum of the three non-interest rates before any scaling.
    pub fn other_fees_pct(&self) -> f64 {
        self.service_fee_rate_pct + self.admin_fee_rate_pct + self.commitment_fee_rate_pct
    }

    /// Check that every rate is finite and non-negative and that a target,
    /// if present, is reachable.
    pub fn validate(&self, term: TermDays) -> LendingResult<()> {
        let fields = [
            ("interest_rate_pct", self.interest_rate_pct),
            ("service_fee_rate_pct", self.service_fee_rate_pct),
            ("admin_fee_rate_pct", self.admin_fee_rate_pct),
            ("commitment_fee_rate_pct", self.commitment_fee_rate_pct),
            ("admin_fee_flat", self.admin_fee_flat),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(LendingError::InvalidRateTable {
                    term,
                    reason: format!("{} must be a non-negative number, got {}", name, value),
                });
            }
        }

        if let Some(target) = self.target_total_pct {
            if !target.is_finite() || target < self.interest_rate_pct {
                return Err(LendingError::InvalidRateTable {
                    term,
                    reason: format!(
                        "target total {}% is below the interest rate {}%",
                        target, self.interest_rate_pct
                    ),
                });
            }
            if self.other_fees_pct() == 0.0 && target > self.interest_rate_pct {
                return Err(LendingError::InvalidRateTable {
                    term,
                    reason: "cannot scale zero base fees to a non-zero target".into(),
                });
            }
        }

        Ok(())
    }
}

/// Mapping from term to rates.
///
/// Lookups fall back to the canonical policy for 7, 14, and 30 day terms
/// when no explicit entry exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    entries: BTreeMap<TermDays, TermRates>,
}

impl RateTable {
    /// An empty table; only canonical terms resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// The three canonical entries, materialized.
    pub fn canonical() -> Self {
        let entries = TermDays::CANONICAL
            .iter()
            .filter_map(|term| TermRates::canonical(*term).map(|rates| (*term, rates)))
            .collect();
        Self { entries }
    }

    /// Insert or replace the rates for a term.
    pub fn insert(&mut self, term: TermDays, rates: TermRates) -> LendingResult<()> {
        if term.days() == 0 {
            return Err(LendingError::InvalidRateTable {
                term,
                reason: "term must be at least one day".into(),
            });
        }
        if term > TermDays::MAX {
            return Err(LendingError::InvalidRateTable {
                term,
                reason: format!("term exceeds the {} day maximum", TermDays::MAX.days()),
            });
        }
        rates.validate(term)?;
        self.entries.insert(term, rates);
        Ok(())
    }

    /// Builder-style insert.
    pub fn with(mut self, term: TermDays, rates: TermRates) -> LendingResult<Self> {
        self.insert(term, rates)?;
        Ok(self)
    }

    /// Explicit entry for a term, without canonical fallback.
    pub fn get(&self, term: TermDays) -> Option<&TermRates> {
        self.entries.get(&term)
    }

    /// Rates for a term: the explicit entry if present, the canonical
    /// policy for 7/14/30, otherwise `UnsupportedTerm`.
    pub fn resolve(&self, term: TermDays) -> LendingResult<TermRates> {
        if let Some(rates) = self.entries.get(&term) {
            return Ok(rates.clone());
        }
        TermRates::canonical(term).ok_or(LendingError::UnsupportedTerm(term))
    }

    /// Whether a term resolves, explicitly or canonically.
    pub fn supports(&self, term: TermDays) -> bool {
        self.entries.contains_key(&term) || term.is_canonical()
    }

    /// Explicitly configured terms in ascending order.
    pub fn terms(&self) -> impl Iterator<Item = TermDays> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_entries() {
        let table = RateTable::canonical();
        assert_eq!(table.len(), 3);

        let seven = table.get(TermDays::SEVEN).unwrap();
        assert_eq!(seven.interest_rate_pct, 1.0);
        assert_eq!(seven.target_total_pct, Some(22.0));
        assert_eq!(seven.other_fees_pct(), 36.0);

        let thirty = table.get(TermDays::THIRTY).unwrap();
        assert_eq!(thirty.interest_rate_pct, 4.0);
        assert_eq!(thirty.target_total_pct, Some(30.0));
    }

    #[test]
    fn resolve_falls_back_to_canonical() {
        let table = RateTable::new();
        let rates = table.resolve(TermDays::FOURTEEN).unwrap();
        assert_eq!(rates.interest_rate_pct, 2.0);
        assert_eq!(rates.target_total_pct, Some(26.0));
    }

    #[test]
    fn resolve_rejects_unknown_term() {
        let table = RateTable::canonical();
        let err = table.resolve(TermDays::new(21)).unwrap_err();
        assert_eq!(err, LendingError::UnsupportedTerm(TermDays::new(21)));
        assert!(!table.supports(TermDays::new(21)));
    }

    #[test]
    fn explicit_entry_supersedes_canonical() {
        let table = RateTable::new()
            .with(TermDays::SEVEN, TermRates::unscaled(5.0, 2.0, 0.0, 1.0))
            .unwrap();
        let rates = table.resolve(TermDays::SEVEN).unwrap();
        assert_eq!(rates.interest_rate_pct, 5.0);
        assert_eq!(rates.target_total_pct, None);
    }

    #[test]
    fn explicit_entry_for_new_term() {
        let table = RateTable::new()
            .with(TermDays::new(60), TermRates::unscaled(8.0, 3.0, 1.0, 1.0))
            .unwrap();
        assert!(table.supports(TermDays::new(60)));
        assert_eq!(table.terms().collect::<Vec<_>>(), vec![TermDays::new(60)]);
    }

    #[test]
    fn negative_rates_rejected() {
        let mut table = RateTable::new();
        let err = table
            .insert(TermDays::SEVEN, TermRates::unscaled(-1.0, 2.0, 0.0, 1.0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RATE_TABLE");
        assert!(table.is_empty());
    }

    #[test]
    fn unreachable_target_rejected() {
        let rates = TermRates::unscaled(5.0, 0.0, 0.0, 0.0).with_target_total_pct(20.0);
        assert!(rates.validate(TermDays::SEVEN).is_err());

        let rates = TermRates::unscaled(5.0, 1.0, 1.0, 1.0).with_target_total_pct(4.0);
        assert!(rates.validate(TermDays::SEVEN).is_err());
    }

    #[test]
    fn zero_day_term_rejected() {
        let mut table = RateTable::new();
        assert!(table
            .insert(TermDays::new(0), TermRates::unscaled(1.0, 0.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn term_beyond_maximum_rejected() {
        let mut table = RateTable::new();
        let err = table
            .insert(TermDays::new(200_000_000), TermRates::unscaled(5.0, 2.0, 0.0, 1.0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RATE_TABLE");
        assert!(table.is_empty());

        assert!(table
            .insert(TermDays::MAX, TermRates::unscaled(5.0, 2.0, 0.0, 1.0))
            .is_ok());
    }

    #[test]
    fn table_serialization() {
        let table = RateTable::canonical();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"7\""));
        let restored: RateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
    }
}
