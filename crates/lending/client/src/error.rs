//! Client error types

use lending_types::{LendingError, LoanState};
use thiserror::Error;

/// Errors from the API-client boundary.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Lending(#[from] LendingError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("loan terms must be accepted before applying")]
    TermsNotAccepted,

    #[error("no loan awaiting repayment (status {0})")]
    NoRepayableLoan(LoanState),

    #[error("payment amount must be a positive finite amount, got {0}")]
    InvalidPaymentAmount(f64),
}

impl ClientError {
    /// The engine error behind this failure, if any.
    pub fn lending(&self) -> Option<&LendingError> {
        match self {
            ClientError::Lending(err) => Some(err),
            _ => None,
        }
    }

    /// Stable code for display; engine errors keep their own codes.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Lending(err) => err.code(),
            ClientError::Http(_) => "HTTP_ERROR",
            ClientError::Json(_) => "INVALID_RESPONSE",
            ClientError::Api { .. } => "API_ERROR",
            ClientError::InvalidConfig(_) => "INVALID_CONFIG",
            ClientError::TermsNotAccepted => "TERMS_NOT_ACCEPTED",
            ClientError::NoRepayableLoan(_) => "NO_REPAYABLE_LOAN",
            ClientError::InvalidPaymentAmount(_) => "INVALID_PAYMENT_AMOUNT",
        }
    }
}

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lending_types::LoanStatus;

    #[test]
    fn lending_errors_keep_their_code() {
        let err: ClientError =
            LendingError::DuplicateActiveLoan(LoanState::Loan(LoanStatus::Pending)).into();
        assert_eq!(err.code(), "DUPLICATE_ACTIVE_LOAN");
        assert!(err.lending().is_some());
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn api_error_display() {
        let err = ClientError::Api {
            status: 400,
            message: "Amount exceeds your level limit".into(),
        };
        assert_eq!(err.to_string(), "API error (400): Amount exceeds your level limit");
        assert_eq!(err.code(), "API_ERROR");
        assert!(err.lending().is_none());
    }

    #[test]
    fn payment_errors_name_the_state() {
        let err = ClientError::NoRepayableLoan(LoanState::Loan(LoanStatus::Pending));
        assert_eq!(err.code(), "NO_REPAYABLE_LOAN");
        assert!(err.to_string().contains("pending"));
        assert_eq!(ClientError::InvalidPaymentAmount(0.0).code(), "INVALID_PAYMENT_AMOUNT");
    }
}
