//! Telephony client abstraction for call-initiation requests.
//!
//! This module defines the `TelephonyClient` trait to abstract the external
//! call API, enabling testability with a scriptable mock implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::lead::LeadId;
use crate::error::Result;

/// Campaign fields carried alongside the dialed number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallData {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub time_zone: String,
}

/// Body of one call-initiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialRequest {
    /// Normalized phone number to dial.
    pub to: String,
    pub lead_id: LeadId,
    pub call_data: CallData,
}

/// Raw response from a call-initiation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

impl DialResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Success response body from the call API. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallAccepted {
    pub call_id: Option<String>,
    pub queue_position: Option<u32>,
}

/// Failure response body from the call API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallRejected {
    pub detail: Option<String>,
}

/// Trait for issuing call-initiation requests.
///
/// This abstraction allows for different implementations (production vs.
/// testing) and makes the dispatcher logic testable without placing real
/// calls.
#[async_trait]
pub trait TelephonyClient: Send + Sync + Clone {
    /// Issue one call-initiation request.
    ///
    /// # Errors
    /// Returns an error only for transport-level faults (network failure,
    /// timeout, invalid URL). Non-success HTTP statuses are returned as a
    /// normal [`DialResponse`] for the caller to interpret.
    async fn dispatch(&self, request: &DialRequest, timeout_ms: u64) -> Result<DialResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production telephony client using reqwest.
#[derive(Clone)]
pub struct ReqwestTelephonyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ReqwestTelephonyClient {
    /// Create a client targeting the given call-initiation URL
    /// (e.g., `https://dialer.example.com/api/make-call`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TelephonyClient for ReqwestTelephonyClient {
    #[tracing::instrument(skip(self, request), fields(lead_id = %request.lead_id, to = %request.to))]
    async fn dispatch(&self, request: &DialRequest, timeout_ms: u64) -> Result<DialResponse> {
        tracing::debug!(
            endpoint = %self.endpoint,
            timeout_ms,
            "Issuing call-initiation request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_millis(timeout_ms))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    lead_id = %request.lead_id,
                    endpoint = %self.endpoint,
                    error = %e,
                    "Call-initiation request failed"
                );
                e
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::info!(
            lead_id = %request.lead_id,
            status,
            response_len = body.len(),
            "Call-initiation request completed"
        );

        Ok(DialResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Mock telephony client for testing.
///
/// Scripted responses are consumed in FIFO order without placing real calls.
///
/// # Example
/// ```ignore
/// let mock = MockTelephonyClient::new();
/// mock.add_response(Ok(DialResponse {
///     status: 200,
///     body: r#"{"callId":"call_1"}"#.to_string(),
/// }));
/// ```
#[derive(Clone, Default)]
pub struct MockTelephonyClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    /// Immediate response
    Immediate(Result<DialResponse>),
    /// Response that waits for a trigger signal before completing
    Triggered {
        response: Result<DialResponse>,
        trigger: oneshot::Receiver<()>,
    },
}

/// Record of a call made to the mock client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub request: DialRequest,
    pub timeout_ms: u64,
}

impl MockTelephonyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response. Responses are consumed in FIFO order across all
    /// dispatches.
    pub fn add_response(&self, response: Result<DialResponse>) {
        self.responses.lock().push(MockResponse::Immediate(response));
    }

    /// Queue a response that completes only once the returned sender is
    /// triggered (by sending `()` or dropping it). Useful for holding an
    /// attempt in flight while the test cancels or inspects state.
    pub fn add_response_with_trigger(
        &self,
        response: Result<DialResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses.lock().push(MockResponse::Triggered {
            response,
            trigger: rx,
        });
        tx
    }

    /// Get all calls that have been made to this mock client.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl TelephonyClient for MockTelephonyClient {
    async fn dispatch(&self, request: &DialRequest, timeout_ms: u64) -> Result<DialResponse> {
        self.calls.lock().push(MockCall {
            request: request.clone(),
            timeout_ms,
        });

        let next = {
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };

        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                // Wait for the trigger signal (proceed either way)
                let _ = trigger.await;
                response
            }
            None => Err(crate::error::OutdialError::Other(anyhow::anyhow!(
                "No mock response configured for call to {}",
                request.to
            ))),
        }
    }
}
