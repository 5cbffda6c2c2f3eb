//! Loan backend API seam and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use lending_types::LoanLevel;

use crate::wire::{
    ApiErrorBody, ApplyRequest, ApplyResponse, Enveloped, LoanRecord, LoanResponse,
    MyLoansResponse, PaymentHistoryResponse, PaymentRequest, PaymentResponse, UserLevel,
};

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// The loan backend, as seen by [`crate::LoanService`].
///
/// Implemented over HTTP by [`HttpLoanApi`]; tests use an in-memory fake.
#[async_trait]
pub trait LoanApi: Send + Sync {
    /// `GET /config`, returning the `data` member.
    async fn fetch_config(&self) -> ClientResult<Value>;

    /// `GET /loans/my-loans`
    async fn my_loans(&self) -> ClientResult<MyLoansResponse>;

    /// `POST /loans/apply`
    async fn apply(&self, request: &ApplyRequest) -> ClientResult<ApplyResponse>;

    /// `GET /loans/:id`
    async fn loan(&self, loan_id: &str) -> ClientResult<LoanRecord>;

    /// `GET /loan-levels/user/current`
    async fn current_level(&self) -> ClientResult<UserLevel>;

    /// `GET /loan-levels`, every active level in the progression.
    async fn loan_levels(&self) -> ClientResult<Vec<LoanLevel>>;

    /// `POST /payments/initiate`
    async fn initiate_payment(&self, request: &PaymentRequest) -> ClientResult<PaymentResponse>;

    /// `GET /payments/history`
    async fn payment_history(&self) -> ClientResult<PaymentHistoryResponse>;
}

/// reqwest-backed [`LoanApi`].
#[derive(Clone, Debug)]
pub struct HttpLoanApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpLoanApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let resp = self.authorized(self.client.get(self.url(path))).send().await?;
        Self::decode(path, resp).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> ClientResult<T> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            debug!(path, status = status.as_u16(), "API request succeeded");
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        warn!(path, status = status.as_u16(), message = %message, "API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl LoanApi for HttpLoanApi {
    async fn fetch_config(&self) -> ClientResult<Value> {
        let path = "config";
        let resp = self.authorized(self.client.get(self.url(path))).send().await?;
        let envelope: Value = Self::decode(path, resp).await?;
        match envelope.get("data") {
            Some(data) => Ok(data.clone()),
            None => Err(ClientError::InvalidConfig(
                "config response has no data member".to_string(),
            )),
        }
    }

    async fn my_loans(&self) -> ClientResult<MyLoansResponse> {
        self.get("loans/my-loans").await
    }

    async fn apply(&self, request: &ApplyRequest) -> ClientResult<ApplyResponse> {
        let path = "loans/apply";
        let resp = self
            .authorized(self.client.post(self.url(path)).json(request))
            .send()
            .await?;
        Self::decode(path, resp).await
    }

    async fn loan(&self, loan_id: &str) -> ClientResult<LoanRecord> {
        let path = format!("loans/{}", loan_id);
        let body: Enveloped<LoanResponse> = self.get(&path).await?;
        Ok(body.into_inner().loan)
    }

    async fn current_level(&self) -> ClientResult<UserLevel> {
        let body: Enveloped<UserLevel> = self.get("loan-levels/user/current").await?;
        Ok(body.into_inner())
    }

    async fn loan_levels(&self) -> ClientResult<Vec<LoanLevel>> {
        let body: Enveloped<Vec<LoanLevel>> = self.get("loan-levels").await?;
        Ok(body.into_inner())
    }

    async fn initiate_payment(&self, request: &PaymentRequest) -> ClientResult<PaymentResponse> {
        let path = "payments/initiate";
        let resp = self
            .authorized(self.client.post(self.url(path)).json(request))
            .send()
            .await?;
        let body: Enveloped<PaymentResponse> = Self::decode(path, resp).await?;
        Ok(body.into_inner())
    }

    async fn payment_history(&self) -> ClientResult<PaymentHistoryResponse> {
        let body: Enveloped<PaymentHistoryResponse> = self.get("payments/history").await?;
        Ok(body.into_inner())
    }
}
