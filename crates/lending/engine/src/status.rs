//! Loan status machine and tracker.
//!
//! ```text
//!   none ──> pending ──> under_review ──> approved ──> disbursed ──> active ──> completed
//!     ^         │             │              │             │           │  ^        │
//!     │         └──────┬──────┘              └─────────────┼───────────┘  │        │
//!     │                v                                   └──────────────┘        │
//!     │            rejected                                                         │
//!     │                │                                                            │
//!     └────────────────┴──────────────────── reset ────────────────────────────────┘
//! ```
//!
//! The client never decides outcomes. Every transition mirrors something
//! the server asserted, and the machine only checks that the assertion is
//! consistent with what the client already knows.

use chrono::Utc;
use tracing::{debug, info, warn};

use lending_types::{LendingError, LendingResult, LoanEvent, LoanState, LoanStatus, StatusChange};

/// Transition table for [`LoanState`].
#[derive(Debug, Clone)]
pub struct LoanStatusMachine;

impl LoanStatusMachine {
    /// Check if a state-level transition is valid.
    pub fn is_valid_transition(from: LoanState, to: LoanState) -> bool {
        use LoanState::{Loan, None};
        use LoanStatus::*;

        match (from, to) {
            // Submission
            (None, Loan(Pending)) => true,
            (None, Loan(UnderReview)) => true,

            // Review
            (Loan(Pending), Loan(UnderReview)) => true,
            (Loan(Pending), Loan(Approved)) => true,
            (Loan(Pending), Loan(Rejected)) => true,
            (Loan(UnderReview), Loan(Approved)) => true,
            (Loan(UnderReview), Loan(Rejected)) => true,

            // Disbursement
            (Loan(Approved), Loan(Disbursed)) => true,
            (Loan(Approved), Loan(Active)) => true,

            // Repayment
            (Loan(Disbursed), Loan(Active)) => true,
            (Loan(Active), Loan(Active)) => true,
            (Loan(Disbursed), Loan(Completed)) => true,
            (Loan(Active), Loan(Completed)) => true,

            // Apply again
            (Loan(Rejected), None) => true,
            (Loan(Completed), None) => true,

            _ => false,
        }
    }

    /// Get valid target states from a state.
    pub fn valid_transitions(from: LoanState) -> Vec<LoanState> {
        std::iter::once(LoanState::None)
            .chain(LoanStatus::ALL.iter().map(|s| LoanState::Loan(*s)))
            .filter(|to| Self::is_valid_transition(from, *to))
            .collect()
    }

    /// Compute the state after `event`, or explain why the event does not
    /// fit the current state.
    pub fn transition(from: LoanState, event: &LoanEvent) -> LendingResult<LoanState> {
        let to = match event {
            LoanEvent::Submitted { status } => LoanState::Loan(*status),
            LoanEvent::Approved => LoanState::Loan(LoanStatus::Approved),
            LoanEvent::Rejected { .. } => LoanState::Loan(LoanStatus::Rejected),
            LoanEvent::StatusAsserted { status } => LoanState::Loan(*status),
            LoanEvent::Disbursed { status } => {
                let to = LoanState::Loan(*status);
                if from != LoanState::Loan(LoanStatus::Approved) {
                    return Err(LendingError::InvalidTransition { from, to });
                }
                to
            }
            LoanEvent::PaymentReceived { remaining_balance } => {
                let to = if *remaining_balance <= 0.0 {
                    LoanState::Loan(LoanStatus::Completed)
                } else {
                    LoanState::Loan(LoanStatus::Active)
                };
                let repaying = from.status().map(|s| s.is_repaying()).unwrap_or(false);
                if !repaying || remaining_balance.is_nan() {
                    return Err(LendingError::InvalidTransition { from, to });
                }
                to
            }
            LoanEvent::Reset => LoanState::None,
        };

        // Duplicate delivery of the status we already hold.
        let reassertion = matches!(
            event,
            LoanEvent::Approved | LoanEvent::Rejected { .. } | LoanEvent::StatusAsserted { .. }
        );
        if reassertion && to == from {
            return Ok(from);
        }

        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(LendingError::InvalidTransition { from, to })
        }
    }

    /// Apply a raw server status string, surfacing unknown values.
    pub fn transition_raw(from: LoanState, raw_status: &str) -> LendingResult<LoanState> {
        let status = LoanStatus::parse(raw_status)?;
        Self::transition(from, &LoanEvent::StatusAsserted { status })
    }

    /// A new application is refused while a loan is in flight.
    pub fn ensure_can_apply(state: LoanState) -> LendingResult<()> {
        if state.has_active_loan() {
            Err(LendingError::DuplicateActiveLoan(state))
        } else {
            Ok(())
        }
    }
}

/// Mirrors one user's loan state and keeps a history of changes.
#[derive(Clone, Debug, Default)]
pub struct LoanTracker {
    loan_id: Option<String>,
    state: LoanState,
    history: Vec<StatusChange>,
}

impl LoanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a server snapshot.
    pub fn from_snapshot(loan_id: Option<String>, state: LoanState) -> Self {
        let mut tracker = Self::new();
        tracker.observe(loan_id, state, "initial snapshot");
        tracker
    }

    pub fn state(&self) -> LoanState {
        self.state
    }

    pub fn loan_id(&self) -> Option<&str> {
        self.loan_id.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Apply an event. On error the state is left untouched.
    pub fn apply(&mut self, event: &LoanEvent) -> LendingResult<LoanState> {
        let from = self.state;
        match LoanStatusMachine::transition(from, event) {
            Ok(to) if to == from && !matches!(event, LoanEvent::PaymentReceived { .. }) => {
                debug!(state = %from, event = event.name(), "Status re-asserted, no change");
                Ok(to)
            }
            Ok(to) => {
                info!(from = %from, to = %to, event = event.name(), "Loan status transition");
                if to.is_none() {
                    self.loan_id = None;
                }
                self.record(from, to, event.describe());
                Ok(to)
            }
            Err(err) => {
                warn!(state = %from, event = event.name(), error = %err, "Rejected loan status transition");
                Err(err)
            }
        }
    }

    /// Apply a raw status string from the server.
    pub fn apply_raw_status(&mut self, raw_status: &str) -> LendingResult<LoanState> {
        match LoanStatus::parse(raw_status) {
            Ok(status) => self.apply(&LoanEvent::StatusAsserted { status }),
            Err(err) => {
                warn!(state = %self.state, raw_status, "Unknown loan status from server");
                Err(err)
            }
        }
    }

    /// Adopt a server-authoritative snapshot (e.g. from `my-loans`) without
    /// checking the transition table.
    pub fn observe(&mut self, loan_id: Option<String>, state: LoanState, reason: &str) {
        let from = self.state;
        self.loan_id = loan_id;
        if from != state {
            debug!(from = %from, to = %state, reason, "Adopted server loan snapshot");
            self.record(from, state, reason.to_string());
        }
    }

    pub fn ensure_can_apply(&self) -> LendingResult<()> {
        LoanStatusMachine::ensure_can_apply(self.state)
    }

    /// Attach the server-issued id after a successful submission.
    pub fn set_loan_id(&mut self, loan_id: impl Into<String>) {
        self.loan_id = Some(loan_id.into());
    }

    fn record(&mut self, from: LoanState, to: LoanState, reason: String) {
        self.state = to;
        self.history.push(StatusChange {
            from,
            to,
            at: Utc::now(),
            reason,
        });
    }
}
