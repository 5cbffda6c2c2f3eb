//! Loan application orchestration.
//!
//! [`LoanService`] ties the engine to a [`LoanApi`]: it keeps the tracked
//! loan state in step with server responses and pushes, guards new
//! applications, and serves quotes from the cached configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use lending_engine::{LevelLimitValidator, LoanTracker};
use lending_types::{
    LendingResult, LoanEvent, LoanLevel, LoanQuote, LoanState, LoanStatus, TermDays,
};

use crate::api::LoanApi;
use crate::config::{ConfigCache, LendingConfig};
use crate::error::{ClientError, ClientResult};
use crate::realtime::{self, NotificationFeed};
use crate::wire::{ApplyRequest, LoanRecord, PaymentRecord, PaymentRequest, PaymentResponse};

/// A new application as entered by the user.
#[derive(Clone, Debug, PartialEq)]
pub struct LoanApplication {
    pub amount: f64,
    pub term: TermDays,
    pub purpose: Option<String>,
    pub terms_accepted: bool,
}

impl LoanApplication {
    pub fn new(amount: f64, term: TermDays) -> Self {
        Self {
            amount,
            term,
            purpose: None,
            terms_accepted: false,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn accept_terms(mut self) -> Self {
        self.terms_accepted = true;
        self
    }
}

/// Result of a successful submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub loan: LoanRecord,
    pub quote: LoanQuote,
    pub state: LoanState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct LoanService<A: LoanApi> {
    api: A,
    tracker: LoanTracker,
    cache: ConfigCache,
    level: Option<LoanLevel>,
    feed: NotificationFeed,
}

impl<A: LoanApi> LoanService<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tracker: LoanTracker::new(),
            cache: ConfigCache::default(),
            level: None,
            feed: NotificationFeed::default(),
        }
    }

    /// Bound applications by the user's level instead of the global limits.
    pub fn with_level(mut self, level: LoanLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_cache(mut self, cache: ConfigCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn tracker(&self) -> &LoanTracker {
        &self.tracker
    }

    pub fn state(&self) -> LoanState {
        self.tracker.state()
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut NotificationFeed {
        &mut self.feed
    }

    pub fn set_level(&mut self, level: LoanLevel) {
        self.level = Some(level);
    }

    /// Level loaded from the server or set by the caller.
    pub fn level(&self) -> Option<&LoanLevel> {
        self.level.as_ref()
    }

    /// Load the user's level from the server. On failure the level already
    /// held (if any) is kept.
    pub async fn refresh_level(&mut self) -> Option<&LoanLevel> {
        match self.api.current_level().await {
            Ok(user_level) => {
                debug!(
                    level = user_level.current_level.level_number,
                    completed_loans = user_level.completed_loans,
                    "Loaded user loan level"
                );
                self.level = Some(user_level.current_level);
            }
            Err(err) => warn!(error = %err, "Could not load user loan level"),
        }
        self.level.as_ref()
    }

    /// Highest level the user's completed loans qualify for.
    pub async fn eligible_level(&self) -> ClientResult<Option<LoanLevel>> {
        let levels = self.api.loan_levels().await?;
        let loans = self.api.my_loans().await?;
        Ok(LevelLimitValidator::eligible_level(loans.completed_count(), &levels).cloned())
    }

    pub async fn config(&mut self) -> ClientResult<LendingConfig> {
        self.config_at(Utc::now()).await
    }

    /// Cached config if fresh, else fetched. A failed fetch falls back to
    /// the last config seen, however old.
    pub async fn config_at(&mut self, now: DateTime<Utc>) -> ClientResult<LendingConfig> {
        if let Some(config) = self.cache.fresh(now) {
            return Ok(config.clone());
        }

        let fetched = match self.api.fetch_config().await {
            Ok(data) => LendingConfig::from_payload(&data),
            Err(err) => Err(err),
        };

        match fetched {
            Ok(config) => {
                debug!(source = ?config.rate_source, terms = config.rate_table.len(), "Loaded lending config");
                self.cache.store(config.clone(), now);
                Ok(config)
            }
            Err(err) => match self.cache.stale() {
                Some(stale) => {
                    warn!(error = %err, "Config fetch failed, using stale config");
                    Ok(stale.clone())
                }
                None => Err(err),
            },
        }
    }

    fn effective_level(&self, config: &LendingConfig) -> LoanLevel {
        self.level
            .clone()
            .unwrap_or_else(|| config.default_level())
    }

    /// Validate the request against the user's level and price it.
    pub async fn quote_at(
        &mut self,
        amount: f64,
        term: TermDays,
        now: DateTime<Utc>,
    ) -> ClientResult<LoanQuote> {
        let config = self.config_at(now).await?;
        let level = self.effective_level(&config);
        LevelLimitValidator::validate_request(amount, term, &level)?;
        Ok(config.calculator().quote_at(amount, term, now)?)
    }

    pub async fn quote(&mut self, amount: f64, term: TermDays) -> ClientResult<LoanQuote> {
        self.quote_at(amount, term, Utc::now()).await
    }

    /// Adopt the server's view of the user's level and loans.
    ///
    /// Every loan status is parsed first; an unknown one fails the sync and
    /// leaves the tracked state untouched.
    pub async fn sync(&mut self) -> ClientResult<LoanState> {
        self.refresh_level().await;
        let loans = self.api.my_loans().await?;

        if let Some(active) = loans.active_loan()? {
            let state = active.state()?;
            self.tracker
                .observe(Some(active.id.clone()), state, "server loan list");
            return Ok(state);
        }

        // No loan in flight; keep showing the outcome of the tracked loan.
        let tracked = self
            .tracker
            .loan_id()
            .and_then(|id| loans.loans.iter().find(|loan| loan.id == id));
        match tracked {
            Some(loan) => {
                let state = loan.state()?;
                self.tracker
                    .observe(Some(loan.id.clone()), state, "server loan list");
                Ok(state)
            }
            None => {
                self.tracker.observe(None, LoanState::None, "no loan on server");
                Ok(LoanState::None)
            }
        }
    }

    /// Submit an application.
    ///
    /// The one-active-loan guard runs before anything else, so a duplicate
    /// attempt never reaches the network.
    pub async fn apply(&mut self, application: LoanApplication) -> ClientResult<ApplyOutcome> {
        self.apply_at(application, Utc::now()).await
    }

    pub async fn apply_at(
        &mut self,
        application: LoanApplication,
        now: DateTime<Utc>,
    ) -> ClientResult<ApplyOutcome> {
        self.tracker.ensure_can_apply()?;
        if !application.terms_accepted {
            return Err(ClientError::TermsNotAccepted);
        }

        let config = self.config_at(now).await?;
        let level = self.effective_level(&config);
        LevelLimitValidator::validate_request(application.amount, application.term, &level)?;
        let quote = config
            .calculator()
            .quote_at(application.amount, application.term, now)?;

        let mut request = ApplyRequest::new(application.amount, application.term, level.level_number)
            .accept_terms();
        request.purpose = application.purpose;

        // From here on the loan exists on the server: nothing below may
        // fail without the tracker holding its id.
        let response = self.api.apply(&request).await?;
        let loan_id = response.loan.id.clone();

        match response.loan.status() {
            Ok(status) => self.record_submission(&loan_id, status),
            Err(err) => {
                // Held as pending until a sync can read the real status.
                warn!(loan_id = %loan_id, error = %err, "Apply response status not recognized");
                self.tracker.observe(
                    Some(loan_id.clone()),
                    LoanState::Loan(LoanStatus::Pending),
                    "apply response",
                );
            }
        }

        info!(
            loan_id = %loan_id,
            amount = application.amount,
            term = %application.term,
            status = %response.loan.status,
            "Loan application submitted"
        );

        Ok(ApplyOutcome {
            state: self.tracker.state(),
            loan: response.loan,
            quote,
            message: response.message,
        })
    }

    /// Track a freshly created loan. If the server's status does not follow
    /// from a submission, the server's status is adopted as-is.
    fn record_submission(&mut self, loan_id: &str, status: LoanStatus) {
        if let Err(err) = self.submission_events(status) {
            warn!(loan_id, status = %status, error = %err, "Adopting server status for new loan");
            self.tracker
                .observe(Some(loan_id.to_string()), LoanState::Loan(status), "apply response");
        }
        self.tracker.set_loan_id(loan_id);
    }

    fn submission_events(&mut self, status: LoanStatus) -> LendingResult<()> {
        if self.tracker.state().status().map(|s| s.is_terminal()).unwrap_or(false) {
            self.tracker.apply(&LoanEvent::Reset)?;
        }
        match status {
            // auto-approval: the loan passed through pending on the server
            LoanStatus::Approved => {
                self.tracker.apply(&LoanEvent::Submitted {
                    status: LoanStatus::Pending,
                })?;
                self.tracker.apply(&LoanEvent::Approved)?;
            }
            status => {
                self.tracker.apply(&LoanEvent::Submitted { status })?;
            }
        }
        Ok(())
    }

    /// Re-read the tracked loan from `/loans/:id` and adopt its status.
    pub async fn refresh_loan(&mut self) -> ClientResult<Option<LoanRecord>> {
        let Some(loan_id) = self.tracker.loan_id().map(str::to_string) else {
            return Ok(None);
        };
        let loan = self.api.loan(&loan_id).await?;
        let state = loan.state()?;
        self.tracker
            .observe(Some(loan.id.clone()), state, "loan detail");
        Ok(Some(loan))
    }

    /// Start a mobile money repayment on the tracked loan.
    ///
    /// The balance is only updated once the server confirms the payment,
    /// through a `payment-received` push or [`LoanService::refresh_loan`].
    pub async fn pay(
        &mut self,
        amount: f64,
        phone_number: Option<String>,
    ) -> ClientResult<PaymentResponse> {
        let state = self.tracker.state();
        let repaying = state.status().map(|s| s.is_repaying()).unwrap_or(false);
        let loan_id = match self.tracker.loan_id() {
            Some(id) if repaying => id.to_string(),
            _ => return Err(ClientError::NoRepayableLoan(state)),
        };
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ClientError::InvalidPaymentAmount(amount));
        }

        let mut request = PaymentRequest::new(loan_id, amount);
        if let Some(phone) = phone_number {
            request = request.with_phone_number(phone);
        }
        let response = self.api.initiate_payment(&request).await?;
        info!(
            loan_id = %request.loan_id,
            amount,
            payment_id = %response.payment.id,
            "Repayment initiated"
        );
        Ok(response)
    }

    pub async fn payment_history(&self) -> ClientResult<Vec<PaymentRecord>> {
        Ok(self.api.payment_history().await?.payments)
    }

    /// Handle a pushed realtime event. Returns the new loan state when the
    /// event concerned the tracked loan.
    pub async fn handle_realtime(
        &mut self,
        event: &str,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> ClientResult<Option<LoanState>> {
        let Some(decoded) = realtime::decode(event, payload)? else {
            return Ok(None);
        };
        self.feed.push(decoded.notification(now));

        let Some(loan_event) = decoded.loan_event()? else {
            return Ok(None);
        };

        if let (Some(tracked), Some(pushed)) = (self.tracker.loan_id(), decoded.loan_id()) {
            if tracked != pushed {
                debug!(tracked, pushed, event, "Ignoring push for another loan");
                return Ok(None);
            }
        }

        let state = self.tracker.apply(&loan_event)?;
        if self.tracker.loan_id().is_none() {
            if let Some(pushed) = decoded.loan_id() {
                self.tracker.set_loan_id(pushed);
            }
        }
        Ok(Some(state))
    }

    /// "Apply again" after a rejected or completed loan.
    pub fn reset(&mut self) -> ClientResult<LoanState> {
        Ok(self.tracker.apply(&LoanEvent::Reset)?)
    }
}
