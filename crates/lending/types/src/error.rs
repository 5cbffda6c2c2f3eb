use thiserror::Error;

use crate::status::LoanState;
use crate::term::TermDays;

/// Errors raised by the fee, limit, and status components.
///
/// Every error is returned as a value; none of the engine code panics on
/// bad input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    #[error("principal {principal} outside level bounds [{min}, {max}]")]
    OutOfRange { principal: f64, min: f64, max: f64 },

    #[error("no rates configured for term {0}")]
    UnsupportedTerm(TermDays),

    #[error("term {term} is not available at level {level}")]
    TermNotAvailable { term: TermDays, level: u32 },

    #[error("unknown loan status: {0:?}")]
    UnknownStatus(String),

    #[error("an active loan already exists (status {0})")]
    DuplicateActiveLoan(LoanState),

    #[error("invalid loan status transition: {from} -> {to}")]
    InvalidTransition { from: LoanState, to: LoanState },

    #[error("principal must be a positive finite amount, got {0}")]
    InvalidPrincipal(f64),

    #[error("invalid rate table entry for {term}: {reason}")]
    InvalidRateTable { term: TermDays, reason: String },
}

impl LendingError {
    /// Stable machine-readable code, shared with the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            LendingError::OutOfRange { .. } => "OUT_OF_RANGE",
            LendingError::UnsupportedTerm(_) => "UNSUPPORTED_TERM",
            LendingError::TermNotAvailable { .. } => "TERM_NOT_AVAILABLE",
            LendingError::UnknownStatus(_) => "UNKNOWN_STATUS",
            LendingError::DuplicateActiveLoan(_) => "DUPLICATE_ACTIVE_LOAN",
            LendingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LendingError::InvalidPrincipal(_) => "INVALID_PRINCIPAL",
            LendingError::InvalidRateTable { .. } => "INVALID_RATE_TABLE",
        }
    }

    /// Whether the caller can recover by reprompting the user.
    ///
    /// Unknown statuses and broken rate tables are data-integrity problems
    /// and should be reported rather than retried.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            LendingError::UnknownStatus(_) | LendingError::InvalidRateTable { .. }
        )
    }
}

/// Result type for lending operations.
pub type LendingResult<T> = Result<T, LendingError>;
