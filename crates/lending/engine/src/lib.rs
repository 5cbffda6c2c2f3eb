//! # lending-engine
//!
//! Pure business logic behind the loan application screens:
//!
//! - **Fee calculator** ([`fee`]): principal × term × [`RateTable`] →
//!   [`LoanQuote`], including the uniform scaling that lands the canonical
//!   terms on their 22% / 26% / 30% totals
//! - **Level limits** ([`limits`]): principal and term bounds per [`LoanLevel`]
//! - **Status machine** ([`status`]): server-driven loan status transitions,
//!   the one-active-loan guard, and a [`LoanTracker`] with history
//!
//! Nothing here performs I/O or holds shared mutable state; every function
//! can be called on each re-render.

#![deny(unsafe_code)]

pub mod fee;
pub mod limits;
pub mod status;

pub use fee::{compute_quote, compute_quote_at, scaled_fee_rates, FeeCalculator};
pub use limits::LevelLimitValidator;
pub use status::{LoanStatusMachine, LoanTracker};

pub use lending_types::{
    LendingError, LendingResult, LoanEvent, LoanLevel, LoanQuote, LoanState, LoanStatus,
    RateTable, StatusChange, TermDays, TermRates,
};
