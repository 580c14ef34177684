//! Paystack transaction API: initialize a hosted payment and verify it by
//! reference once the customer returns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{ClientError, decode_json};
use crate::config::PaystackConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Input for `POST /transaction/initialize`. `amount` is in minor units (kobo).
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

/// Outcome of `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub success: bool,
    pub reference: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    /// Gateway message suitable for showing to the customer.
    pub message: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the browser on the checkout page.
    fn public_key(&self) -> Option<&str>;

    async fn initialize(&self, request: &InitializeTransaction)
    -> Result<Authorization, ClientError>;

    async fn verify(&self, reference: &str) -> Result<Verification, ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: Option<i64>,
    currency: Option<String>,
    gateway_response: Option<String>,
    customer: Option<VerifyCustomer>,
}

#[derive(Debug, Deserialize)]
struct VerifyCustomer {
    email: Option<String>,
}

#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: String,
    public_key: Option<String>,
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ClientError::InvalidRequest(format!("invalid secret key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            public_key: config.public_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    async fn initialize(
        &self,
        request: &InitializeTransaction,
    ) -> Result<Authorization, ClientError> {
        if request.amount <= 0 {
            return Err(ClientError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }
        let url = format!("{}/transaction/initialize", self.base_url);
        tracing::info!(
            reference = %request.reference,
            amount = request.amount,
            "initializing paystack transaction"
        );

        let response = self.client.post(&url).json(request).send().await?;
        let envelope: Envelope<InitializeData> = decode_json(response).await?;

        match envelope {
            Envelope {
                status: true,
                data: Some(data),
                ..
            } => Ok(Authorization {
                authorization_url: data.authorization_url,
                access_code: data.access_code,
                reference: data.reference,
            }),
            Envelope { message, .. } => Err(ClientError::Rejected(if message.is_empty() {
                "Failed to initialize payment.".to_string()
            } else {
                message
            })),
        }
    }

    async fn verify(&self, reference: &str) -> Result<Verification, ClientError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.base_url,
            urlencoding::encode(reference)
        );
        tracing::info!(reference, "verifying paystack transaction");

        let response = self.client.get(&url).send().await?;
        let envelope: Envelope<VerifyData> = decode_json(response).await?;

        Ok(verification_from(reference, envelope))
    }
}

fn verification_from(reference: &str, envelope: Envelope<VerifyData>) -> Verification {
    match envelope.data {
        Some(data) => Verification {
            success: envelope.status && data.status == "success",
            message: data
                .gateway_response
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if envelope.message.is_empty() {
                        "Payment not successful.".to_string()
                    } else {
                        envelope.message.clone()
                    }
                }),
            reference: data.reference,
            amount: data.amount,
            currency: data.currency,
            customer_email: data.customer.and_then(|c| c.email),
        },
        None => Verification {
            success: false,
            reference: reference.to_string(),
            amount: None,
            currency: None,
            customer_email: None,
            message: if envelope.message.is_empty() {
                "Payment verification failed.".to_string()
            } else {
                envelope.message
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PaystackClient {
        PaystackClient::new(&PaystackConfig {
            secret_key: SecretString::from("sk_test_abc".to_string()),
            public_key: Some("pk_test_abc".to_string()),
            base_url: server.uri(),
        })
        .expect("client")
    }

    fn init_request() -> InitializeTransaction {
        InitializeTransaction {
            email: "buyer@example.com".into(),
            amount: 10_000,
            currency: "NGN".into(),
            reference: "HOXOBIL-ABC".into(),
            callback_url: "http://localhost/api/payments/callback".into(),
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn initialize_returns_authorization_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .and(header("authorization", "Bearer sk_test_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/xyz",
                    "access_code": "xyz",
                    "reference": "HOXOBIL-ABC"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = client_for(&server)
            .initialize(&init_request())
            .await
            .expect("authorization");
        assert_eq!(auth.authorization_url, "https://checkout.paystack.com/xyz");
        assert_eq!(auth.reference, "HOXOBIL-ABC");
    }

    #[tokio::test]
    async fn initialize_status_false_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": false,
                "message": "Duplicate Transaction Reference"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .initialize(&init_request())
            .await
            .expect_err("rejected");
        assert!(matches!(err, ClientError::Rejected(msg) if msg == "Duplicate Transaction Reference"));
    }

    #[tokio::test]
    async fn initialize_http_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .initialize(&init_request())
            .await
            .expect_err("api error");
        assert!(matches!(err, ClientError::Api { status: 401, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn verify_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/R1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "status": "success",
                    "reference": "R1",
                    "amount": 10000,
                    "currency": "NGN",
                    "gateway_response": "Successful",
                    "customer": { "email": "buyer@example.com" }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/R2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "status": "failed",
                    "reference": "R2",
                    "amount": 10000,
                    "gateway_response": "Declined"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let ok = client.verify("R1").await.expect("verify");
        assert!(ok.success);
        assert_eq!(ok.amount, Some(10_000));
        assert_eq!(ok.customer_email.as_deref(), Some("buyer@example.com"));

        let failed = client.verify("R2").await.expect("verify");
        assert!(!failed.success);
        assert_eq!(failed.message, "Declined");
    }

    #[tokio::test]
    async fn verify_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/R3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).verify("R3").await.expect_err("decode");
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
