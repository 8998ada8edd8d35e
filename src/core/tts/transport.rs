//! Transport seam between the synthesis client and the network.
//!
//! The client prepares a [`PreparedCall`] and hands it to a
//! [`SynthesisTransport`]. [`HttpTransport`] is the reqwest-backed
//! implementation; tests substitute scripted transports.

use async_trait::async_trait;
use tracing::{debug, error};

use super::error::AttemptError;

/// A fully built synthesis request, ready to be sent.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub endpoint: String,
    pub request_id: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl PreparedCall {
    /// Look up a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Successful HTTP exchange: a 2xx status and the raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends prepared calls. Implementations report non-2xx statuses as
/// [`AttemptError::Http`] and never retry on their own.
#[async_trait]
pub trait SynthesisTransport: Send + Sync {
    async fn send(&self, call: &PreparedCall) -> Result<RawResponse, AttemptError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with a fresh connection pool.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SynthesisTransport for HttpTransport {
    async fn send(&self, call: &PreparedCall) -> Result<RawResponse, AttemptError> {
        let mut request = self.client.post(&call.endpoint);
        for (name, value) in &call.headers {
            request = request.header(*name, value);
        }

        let response = request.body(call.body.clone()).send().await.map_err(|e| {
            error!(request_id = %call.request_id, error = %e, "Synthesis request failed");
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Network(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            error!(
                request_id = %call.request_id,
                status = %status,
                body = %body,
                "Synthesis API returned error"
            );
            return Err(AttemptError::Http {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            request_id = %call.request_id,
            body_len = body.len(),
            "Synthesis response received"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}
