use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::term::TermDays;

/// Fee breakdown and repayment for one (principal, term) pair.
///
/// Quotes are derived values: they are recomputed whenever an input
/// changes and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub principal: f64,
    pub term: TermDays,

    /// Effective rates after any target scaling, percent of principal.
    pub interest_rate_pct: f64,
    pub service_fee_rate_pct: f64,
    pub admin_fee_rate_pct: f64,
    pub commitment_fee_rate_pct: f64,

    pub interest_amount: f64,
    pub service_fee: f64,
    pub admin_fee: f64,
    pub commitment_fee: f64,
    pub total_fees: f64,
    pub total_repayment: f64,

    pub due_date: DateTime<Utc>,
}

impl LoanQuote {
    /// Total fees as a percentage of principal, as shown on the summary card.
    pub fn total_fee_rate_pct(&self) -> f64 {
        self.total_fees / self.principal * 100.0
    }

    /// Fee lines with a non-zero amount, in display order.
    pub fn fee_lines(&self) -> Vec<(&'static str, f64)> {
        [
            ("Interest", self.interest_amount),
            ("Service Fee", self.service_fee),
            ("Administration Fee", self.admin_fee),
            ("Commitment Fee", self.commitment_fee),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .collect()
    }
}
