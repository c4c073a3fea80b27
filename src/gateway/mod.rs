//! Outbound payment gateway client.
//!
//! The gateway issues a hosted checkout session on initialize and reports
//! the transaction status on verify. Verification is only ever pulled by
//! this service; there is no inbound webhook path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::GatewayConfig;
use crate::errors::ServiceError;

const TRANSACTION_SUCCESS: &str = "success";

/// Request body for `POST /transaction/initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    /// Amount in the gateway's minor units
    pub amount: i64,
    pub reference: String,
    pub callback_url: String,
}

/// Outcome of an initialize call that reached the gateway.
#[derive(Debug)]
pub enum InitializeOutcome {
    /// Gateway accepted; the caller is redirected to the hosted session.
    Accepted { authorization_url: String },
    /// Gateway answered with a non-success payload, passed through verbatim.
    Declined { body: serde_json::Value },
}

/// Outcome of a verify call that reached the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyOutcome {
    /// Gateway-side transaction status, e.g. "success", "failed", "abandoned"
    pub transaction_status: String,
}

impl VerifyOutcome {
    pub fn is_success(&self) -> bool {
        self.transaction_status == TRANSACTION_SUCCESS
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway response unreadable: {0}")]
    Decode(String),
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

/// Seam for the external gateway so the payment service can be exercised
/// against a stub in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializeOutcome, GatewayError>;

    async fn verify_transaction(&self, reference: &str) -> Result<VerifyOutcome, GatewayError>;
}

/// Paystack-shaped HTTP client.
///
/// No request timeout is configured; a stalled gateway stalls the calling
/// request, matching the behavior this service replaces.
pub struct PaystackGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct InitializeResponseBody {
    status: bool,
    #[serde(default)]
    data: Option<InitializeResponseData>,
}

#[derive(Debug, Deserialize)]
struct InitializeResponseData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponseBody {
    #[serde(default)]
    data: Option<VerifyResponseData>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponseData {
    status: String,
}

impl PaystackGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializeOutcome, GatewayError> {
        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;

        let parsed: InitializeResponseBody = serde_json::from_value(body.clone())
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        if parsed.status {
            let data = parsed
                .data
                .ok_or_else(|| GatewayError::Decode("missing data.authorization_url".into()))?;
            Ok(InitializeOutcome::Accepted {
                authorization_url: data.authorization_url,
            })
        } else {
            Ok(InitializeOutcome::Declined { body })
        }
    }

    #[instrument(skip(self))]
    async fn verify_transaction(&self, reference: &str) -> Result<VerifyOutcome, GatewayError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let body: VerifyResponseBody = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let data = body
            .data
            .ok_or_else(|| GatewayError::Decode("missing data.status".into()))?;

        Ok(VerifyOutcome {
            transaction_status: data.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_outcome_success_matching() {
        assert!(VerifyOutcome {
            transaction_status: "success".into()
        }
        .is_success());
        assert!(!VerifyOutcome {
            transaction_status: "failed".into()
        }
        .is_success());
        assert!(!VerifyOutcome {
            transaction_status: "Success".into()
        }
        .is_success());
    }

    #[test]
    fn initialize_request_serializes_gateway_fields() {
        let request = InitializeTransaction {
            email: "buyer@example.com".to_string(),
            amount: 35050,
            reference: "ref-1".to_string(),
            callback_url: "https://app.example.com/done".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["email"], "buyer@example.com");
        assert_eq!(value["amount"], 35050);
        assert_eq!(value["reference"], "ref-1");
        assert_eq!(value["callback_url"], "https://app.example.com/done");
    }
}
