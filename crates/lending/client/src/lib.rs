//! # lending-client
//!
//! Boundary between the lending engine and the CEDI loan backend.
//!
//! - [`config`]: normalizes the backend `/config` payload into a
//!   [`LendingConfig`] and caches it for five minutes
//! - [`wire`]: request/response shapes for the loan, level, and payment
//!   endpoints
//! - [`realtime`]: decoding of pushed socket events and the notification feed
//! - [`api`]: the [`LoanApi`] seam and its reqwest implementation
//! - [`service`]: [`LoanService`], which keeps the loan tracker in step with
//!   the server and enforces the one-active-loan rule before any request

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod realtime;
pub mod service;
pub mod wire;

pub use api::{HttpLoanApi, LoanApi, DEFAULT_API_URL};
pub use config::{ConfigCache, FeeStructure, LendingConfig, RateSource};
pub use error::{ClientError, ClientResult};
pub use realtime::{Notification, NotificationFeed, NotificationKind, RealtimeEvent};
pub use service::{ApplyOutcome, LoanApplication, LoanService};
pub use wire::{
    ApplyRequest, ApplyResponse, LoanRecord, MyLoansResponse, PaymentHistoryResponse,
    PaymentRecord, PaymentRequest, PaymentResponse, UserLevel,
};
