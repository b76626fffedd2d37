//! Outbound HTTP transport for the upstream identity/resource API
//!
//! AuthGateway and ResourceProxy talk to the backend through the
//! [`ApiTransport`] trait rather than a shared mutable client, so both are
//! substitutable in tests. The production implementation wraps reqwest with
//! the configured connect and per-request timeouts.

pub mod models;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::Args;
use crate::types::GatewayError;

/// Method of an outbound API call. The upstream contract only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

/// Body of an outbound API call.
#[derive(Debug, Clone)]
pub enum ApiBody {
    /// Form-encoded pairs (login endpoint).
    Form(Vec<(&'static str, String)>),
    /// JSON payload (resource writes).
    Json(serde_json::Value),
}

/// A single outbound call to the upstream API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: ApiMethod,
    /// Path relative to the configured upstream base URL, e.g. "/plates/".
    pub path: String,
    /// Bearer token attached as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    pub body: Option<ApiBody>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, bearer: &str) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            bearer: Some(bearer.to_string()),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: ApiBody) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }
}

/// Raw response from the upstream API.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure before any HTTP status was received.
///
/// The detail string is for logs only; user-visible messages are generic and
/// never carry raw transport error text.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}

/// Capability to send one request upstream and get a response or a failure.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportFailure>;
}

/// Production transport backed by reqwest with bounded timeouts.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn from_args(args: &Args) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(args.connect_timeout_ms))
            .timeout(std::time::Duration::from_millis(args.request_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: args.upstream_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportFailure> {
        let url = format!("{}{}", self.base_url, req.path);

        let mut builder = match req.method {
            ApiMethod::Get => self.client.get(&url),
            ApiMethod::Post => self.client.post(&url),
        };

        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }

        match req.body {
            Some(ApiBody::Form(pairs)) => builder = builder.form(&pairs),
            Some(ApiBody::Json(value)) => builder = builder.json(&value),
            None => {}
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportFailure::Timeout
            } else {
                TransportFailure::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportFailure::Timeout
            } else {
                TransportFailure::Unreachable(e.to_string())
            }
        })?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for component tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns canned responses in order and records every request sent,
    /// so tests can assert that a denied route performed no upstream call.
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<ApiResponse, TransportFailure>>>,
        calls: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn push_response(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(ApiResponse {
                status,
                body: Bytes::from(body.to_string()),
            }));
        }

        pub fn push_failure(&self, failure: TransportFailure) {
            self.responses.lock().unwrap().push_back(Err(failure));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn recorded_calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiTransport for MockTransport {
        async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportFailure> {
            self.calls.lock().unwrap().push(req);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportFailure::Unreachable(
                        "mock transport exhausted".to_string(),
                    ))
                })
        }
    }
}
