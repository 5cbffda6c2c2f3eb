//! JSON shapes exchanged with the loan backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lending_types::{LendingResult, LoanLevel, LoanState, LoanStatus, TermDays};

/// `POST /loans/apply` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub amount: f64,
    pub term_in_days: TermDays,
    /// Human label, e.g. "7 days".
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub terms_accepted: bool,
    pub loan_level: u32,
}

impl ApplyRequest {
    pub fn new(amount: f64, term: TermDays, loan_level: u32) -> Self {
        Self {
            amount,
            term_in_days: term,
            duration: term.label(),
            purpose: None,
            terms_accepted: false,
            loan_level,
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

/// A loan as returned by the backend.
///
/// `status` stays a raw string here; it is parsed through
/// [`LoanRecord::status`] so an unknown value surfaces as an error instead
/// of failing the whole response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoanRecord {
    pub fn status(&self) -> LendingResult<LoanStatus> {
        LoanStatus::parse(&self.status)
    }

    pub fn state(&self) -> LendingResult<LoanState> {
        self.status().map(LoanState::Loan)
    }

    /// Whether this loan blocks a new application. An unrecognized
    /// status is an error, not "inactive".
    pub fn is_active(&self) -> LendingResult<bool> {
        self.status().map(|s| s.blocks_new_application())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub loan: LoanRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MyLoansResponse {
    #[serde(default)]
    pub loans: Vec<LoanRecord>,
}

impl MyLoansResponse {
    pub fn active_loan(&self) -> LendingResult<Option<&LoanRecord>> {
        find_active_loan(&self.loans)
    }

    /// Loans that reached `completed`, for level progression.
    pub fn completed_count(&self) -> u32 {
        let completed = self
            .loans
            .iter()
            .filter(|loan| matches!(loan.status(), Ok(LoanStatus::Completed)))
            .count();
        u32::try_from(completed).unwrap_or(u32::MAX)
    }
}

/// `GET /loans/:id` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan: LoanRecord,
}

/// A payload either wrapped as `{"success": .., "data": ..}` or sent bare.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Enveloped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Enveloped<T> {
    pub fn into_inner(self) -> T {
        match self {
            Enveloped::Wrapped { data } => data,
            Enveloped::Bare(inner) => inner,
        }
    }
}

/// `GET /loan-levels/user/current` data: the user's level and progress
/// toward the next one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLevel {
    #[serde(alias = "level")]
    pub current_level: LoanLevel,
    #[serde(default)]
    pub completed_loans: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_level: Option<LoanLevel>,
}

/// `POST /payments/initiate` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub loan_id: String,
    pub amount: f64,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl PaymentRequest {
    pub const MOBILE_MONEY: &'static str = "mobile_money";

    pub fn new(loan_id: impl Into<String>, amount: f64) -> Self {
        Self {
            loan_id: loan_id.into(),
            amount,
            payment_method: Self::MOBILE_MONEY.to_string(),
            phone_number: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = method.into();
        self
    }

    pub fn with_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }
}

/// A repayment as recorded by the backend. Payment statuses
/// (`pending`, `completed`, `failed`, ...) are the payment provider's and
/// are kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment: PaymentRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryResponse {
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

/// Error body; the backend uses either `message` or `error`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// First loan whose status blocks a new application.
///
/// Every record's status is parsed, so one unknown status anywhere in the
/// list fails the lookup instead of hiding a loan that may be in flight.
pub fn find_active_loan(loans: &[LoanRecord]) -> LendingResult<Option<&LoanRecord>> {
    let mut active = None;
    for loan in loans {
        if loan.is_active()? && active.is_none() {
            active = Some(loan);
        }
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lending_types::LendingError;
    use serde_json::json;

    #[test]
    fn apply_request_shape() {
        let req = ApplyRequest::new(500.0, TermDays::FOURTEEN, 2)
            .with_purpose("Stock for shop")
            .accept_terms();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "amount": 500.0,
                "termInDays": 14,
                "duration": "14 days",
                "purpose": "Stock for shop",
                "termsAccepted": true,
                "loanLevel": 2
            })
        );
    }

    #[test]
    fn loan_record_accepts_either_id_key() {
        let a: LoanRecord =
            serde_json::from_value(json!({ "_id": "L1", "status": "pending", "amount": 100 }))
                .unwrap();
        let b: LoanRecord =
            serde_json::from_value(json!({ "id": "L1", "status": "pending", "amount": 100 }))
                .unwrap();
        assert_eq!(a.id, "L1");
        assert_eq!(a, b);
    }

    #[test]
    fn loan_record_keeps_unknown_fields() {
        let record: LoanRecord = serde_json::from_value(json!({
            "_id": "L2",
            "status": "active",
            "amount": 300,
            "totalAmount": 390,
            "dueDate": "2025-03-31T12:00:00Z",
            "remainingBalance": 190,
            "purpose": "school fees"
        }))
        .unwrap();
        assert_eq!(record.total_amount, Some(390.0));
        assert_eq!(record.remaining_balance, Some(190.0));
        assert_eq!(record.extra["purpose"], "school fees");
        assert_eq!(record.state().unwrap(), LoanState::Loan(LoanStatus::Active));
    }

    #[test]
    fn unknown_status_is_an_error_not_a_parse_failure() {
        let record: LoanRecord =
            serde_json::from_value(json!({ "_id": "L3", "status": "frozen" })).unwrap();
        assert_eq!(record.status().unwrap_err().code(), "UNKNOWN_STATUS");
        assert_eq!(record.is_active().unwrap_err().code(), "UNKNOWN_STATUS");
    }

    #[test]
    fn unknown_status_in_history_fails_active_lookup() {
        let resp: MyLoansResponse = serde_json::from_value(json!({
            "loans": [
                { "_id": "old", "status": "completed" },
                { "_id": "odd", "status": "frozen" }
            ]
        }))
        .unwrap();
        let err = resp.active_loan().unwrap_err();
        assert_eq!(err, LendingError::UnknownStatus("frozen".into()));

        // an active loan earlier in the list does not mask it either
        let current: LoanRecord =
            serde_json::from_value(json!({ "_id": "cur", "status": "active" })).unwrap();
        let loans = vec![current, resp.loans[1].clone()];
        assert!(find_active_loan(&loans).is_err());
    }

    #[test]
    fn finds_active_loan_among_history() {
        let resp: MyLoansResponse = serde_json::from_value(json!({
            "loans": [
                { "_id": "old", "status": "completed" },
                { "_id": "bad", "status": "rejected" },
                { "_id": "cur", "status": "under_review" }
            ]
        }))
        .unwrap();
        assert_eq!(
            resp.active_loan().unwrap().map(|l| l.id.as_str()),
            Some("cur")
        );
        assert_eq!(resp.completed_count(), 1);

        let empty: MyLoansResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.active_loan().unwrap().is_none());
    }

    #[test]
    fn enveloped_payloads_unwrap_either_way() {
        let wrapped: Enveloped<UserLevel> = serde_json::from_value(json!({
            "success": true,
            "data": {
                "currentLevel": { "levelNumber": 2, "name": "Silver", "minAmount": 100, "maxAmount": 2000 },
                "completedLoans": 4
            }
        }))
        .unwrap();
        let level = wrapped.into_inner();
        assert_eq!(level.current_level.level_number, 2);
        assert_eq!(level.completed_loans, 4);
        assert!(level.next_level.is_none());

        let bare: Enveloped<Vec<LoanLevel>> = serde_json::from_value(json!([
            { "levelNumber": 1, "name": "Starter", "minAmount": 100, "maxAmount": 500 }
        ]))
        .unwrap();
        assert_eq!(bare.into_inner().len(), 1);
    }

    #[test]
    fn payment_request_shape() {
        let req = PaymentRequest::new("L9", 150.0).with_phone_number("0244000000");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "loanId": "L9",
                "amount": 150.0,
                "paymentMethod": "mobile_money",
                "phoneNumber": "0244000000"
            })
        );
    }

    #[test]
    fn payment_history_keeps_provider_fields() {
        let history: PaymentHistoryResponse = serde_json::from_value(json!({
            "payments": [
                { "_id": "P1", "loanId": "L9", "amount": 50, "status": "completed",
                  "createdAt": "2025-04-02T10:00:00Z", "reference": "MOMO-123" }
            ]
        }))
        .unwrap();
        let payment = &history.payments[0];
        assert_eq!(payment.loan_id.as_deref(), Some("L9"));
        assert_eq!(payment.status, "completed");
        assert_eq!(payment.extra["reference"], "MOMO-123");
    }

    #[test]
    fn error_body_prefers_message() {
        let body: ApiErrorBody =
            serde_json::from_value(json!({ "message": "m", "error": "e" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("m"));
        let body: ApiErrorBody = serde_json::from_value(json!({ "error": "e" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("e"));
    }
}
