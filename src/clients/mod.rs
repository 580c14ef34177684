//! HTTP clients for the two external services the store depends on: the
//! Printify print-on-demand API and the Paystack payment gateway.
//!
//! Both are exposed behind traits so the checkout and callback flows can be
//! driven by in-process fakes in tests.

pub mod paystack;
pub mod printify;

use thiserror::Error;

pub use paystack::{PaymentGateway, PaystackClient};
pub use printify::{PrintProvider, PrintifyClient};

/// Errors that can occur when talking to an external API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, timeout, TLS.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The body could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The API answered 2xx but reported `status: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The request was not sent because its inputs were unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(err) => err.is_timeout() || err.is_connect(),
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Reads a response body, mapping non-2xx statuses and bad JSON to `ClientError`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
}
