use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Loan status as asserted by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    #[serde(alias = "under-review")]
    UnderReview,
    Approved,
    Rejected,
    Disbursed,
    Active,
    Completed,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 7] = [
        LoanStatus::Pending,
        LoanStatus::UnderReview,
        LoanStatus::Approved,
        LoanStatus::Rejected,
        LoanStatus::Disbursed,
        LoanStatus::Active,
        LoanStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::UnderReview => "under_review",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Disbursed => "disbursed",
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
        }
    }

    /// Parse a server status string. Anything outside the enum is an
    /// `UnknownStatus` error, never coerced.
    pub fn parse(raw: &str) -> Result<Self, LendingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "under_review" | "under-review" => Ok(LoanStatus::UnderReview),
            "approved" => Ok(LoanStatus::Approved),
            "rejected" => Ok(LoanStatus::Rejected),
            "disbursed" => Ok(LoanStatus::Disbursed),
            "active" => Ok(LoanStatus::Active),
            "completed" => Ok(LoanStatus::Completed),
            _ => Err(LendingError::UnknownStatus(raw.to_string())),
        }
    }

    /// Statuses that block a new application.
    pub fn blocks_new_application(&self) -> bool {
        matches!(
            self,
            LoanStatus::Pending
                | LoanStatus::UnderReview
                | LoanStatus::Approved
                | LoanStatus::Disbursed
                | LoanStatus::Active
        )
    }

    /// Terminal statuses only leave through an explicit reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Rejected | LoanStatus::Completed)
    }

    /// Awaiting a server decision.
    pub fn is_in_review(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::UnderReview)
    }

    /// Money is out and repayments are expected.
    pub fn is_repaying(&self) -> bool {
        matches!(self, LoanStatus::Disbursed | LoanStatus::Active)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Client-side view of a user's loan: either no loan, or exactly one
/// loan in one status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LoanState {
    #[default]
    None,
    Loan(LoanStatus),
}

impl LoanState {
    pub fn status(&self) -> Option<LoanStatus> {
        match self {
            LoanState::None => None,
            LoanState::Loan(status) => Some(*status),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LoanState::None)
    }

    pub fn has_active_loan(&self) -> bool {
        self.status()
            .map(|s| s.blocks_new_application())
            .unwrap_or(false)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::None => "none",
            LoanState::Loan(status) => status.as_str(),
        }
    }
}

impl From<LoanStatus> for LoanState {
    fn from(status: LoanStatus) -> Self {
        LoanState::Loan(status)
    }
}

impl From<LoanState> for String {
    fn from(state: LoanState) -> Self {
        state.as_str().to_string()
    }
}

impl TryFrom<String> for LoanState {
    type Error = LendingError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.trim().eq_ignore_ascii_case("none") {
            Ok(LoanState::None)
        } else {
            LoanStatus::parse(&raw).map(LoanState::Loan)
        }
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the server said happened to a loan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanEvent {
    /// Application accepted by the server, landing in `status`.
    Submitted { status: LoanStatus },
    Approved,
    Rejected {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Funds released; `status` is `disbursed` or `active`.
    Disbursed { status: LoanStatus },
    PaymentReceived { remaining_balance: f64 },
    /// A bare status push, e.g. from a `loan-status-changed` socket event.
    StatusAsserted { status: LoanStatus },
    /// User chose to apply again after a rejection or completion.
    Reset,
}

impl LoanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LoanEvent::Submitted { .. } => "submitted",
            LoanEvent::Approved => "approved",
            LoanEvent::Rejected { .. } => "rejected",
            LoanEvent::Disbursed { .. } => "disbursed",
            LoanEvent::PaymentReceived { .. } => "payment_received",
            LoanEvent::StatusAsserted { .. } => "status_asserted",
            LoanEvent::Reset => "reset",
        }
    }

    /// Human-readable reason recorded in status history.
    pub fn describe(&self) -> String {
        match self {
            LoanEvent::Submitted { status } => format!("application submitted ({})", status),
            LoanEvent::Approved => "approved by server".to_string(),
            LoanEvent::Rejected { reason: Some(r) } => format!("rejected: {}", r),
            LoanEvent::Rejected { reason: None } => "rejected by server".to_string(),
            LoanEvent::Disbursed { status } => format!("funds disbursed ({})", status),
            LoanEvent::PaymentReceived { remaining_balance } => {
                format!("payment received, remaining balance {:.2}", remaining_balance)
            }
            LoanEvent::StatusAsserted { status } => format!("server asserted {}", status),
            LoanEvent::Reset => "user chose to apply again".to_string(),
        }
    }
}

/// Record of a status change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: LoanState,
    pub to: LoanState,
    pub at: DateTime<Utc>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_review_spellings() {
        assert_eq!(LoanStatus::parse("under_review").unwrap(), LoanStatus::UnderReview);
        assert_eq!(LoanStatus::parse("under-review").unwrap(), LoanStatus::UnderReview);
        assert_eq!(LoanStatus::parse(" Active ").unwrap(), LoanStatus::Active);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = LoanStatus::parse("reverted").unwrap_err();
        assert_eq!(err, LendingError::UnknownStatus("reverted".into()));
    }

    #[test]
    fn blocking_statuses() {
        let blocking: Vec<_> = LoanStatus::ALL
            .iter()
            .filter(|s| s.blocks_new_application())
            .collect();
        assert_eq!(blocking.len(), 5);
        assert!(!LoanStatus::Rejected.blocks_new_application());
        assert!(!LoanStatus::Completed.blocks_new_application());
    }

    #[test]
    fn state_string_round_trip() {
        for status in LoanStatus::ALL {
            let state = LoanState::Loan(status);
            let json = serde_json::to_string(&state).unwrap();
            let back: LoanState = serde_json::from_str(&json).unwrap();
            assert_eq!(back, state);
        }
        assert_eq!(serde_json::to_string(&LoanState::None).unwrap(), "\"none\"");
        assert!(serde_json::from_str::<LoanState>("\"frozen\"").is_err());
    }

    #[test]
    fn status_serde_alias() {
        let s: LoanStatus = serde_json::from_str("\"under-review\"").unwrap();
        assert_eq!(s, LoanStatus::UnderReview);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"under_review\"");
    }

    #[test]
    fn event_tagging() {
        let event = LoanEvent::PaymentReceived {
            remaining_balance: 12.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "payment_received");
        assert_eq!(event.name(), "payment_received");
        assert!(event.describe().contains("12.50"));
    }
}
