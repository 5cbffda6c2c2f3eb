//! # lending-types
//!
//! Shared domain types for the CEDI lending engine:
//!
//! - **Terms and rates**: [`TermDays`], [`TermRates`], [`RateTable`] with the
//!   canonical 7/14/30 day policy
//! - **Quotes**: [`LoanQuote`], the derived fee breakdown for a principal and term
//! - **Levels**: [`LoanLevel`], the backend-owned user tier
//! - **Statuses**: [`LoanStatus`], [`LoanState`], [`LoanEvent`], [`StatusChange`]
//! - **Errors**: [`LendingError`] with stable codes (`OUT_OF_RANGE`,
//!   `UNSUPPORTED_TERM`, `UNKNOWN_STATUS`, `DUPLICATE_ACTIVE_LOAN`, ...)

#![deny(unsafe_code)]

pub mod error;
pub mod level;
pub mod quote;
pub mod rates;
pub mod status;
pub mod term;

pub use error::{LendingError, LendingResult};
pub use level::LoanLevel;
pub use quote::LoanQuote;
pub use rates::{
    canonical_interest_rate_pct, canonical_target_total_pct, RateTable, TermRates,
    BASE_ADMIN_FEE_RATE_PCT, BASE_COMMITMENT_FEE_RATE_PCT, BASE_SERVICE_FEE_RATE_PCT,
};
pub use status::{LoanEvent, LoanState, LoanStatus, StatusChange};
pub use term::TermDays;
