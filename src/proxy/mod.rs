//! Bearer-authenticated relay to the upstream resource API
//!
//! Attaches the session's token to every outbound call and normalizes every
//! failure into [`RelayError`] before it reaches the router. An empty result
//! list is a success; it is never conflated with a backend failure.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::upstream::models::{AdminLogEntry, AdminPlateEntry, PlateEntry};
use crate::upstream::{ApiBody, ApiRequest, ApiTransport, TransportFailure};

/// Why an upstream call failed after it was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Non-success HTTP status (other than 401).
    Status(u16),
    /// 2xx status but a body that does not match the documented shape.
    MalformedBody,
    /// The bounded per-call timeout elapsed.
    Timeout,
    /// Connection-level failure before any status was received.
    Unreachable,
}

impl std::fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamKind::Status(code) => write!(f, "status {code}"),
            UpstreamKind::MalformedBody => write!(f, "malformed body"),
            UpstreamKind::Timeout => write!(f, "timeout"),
            UpstreamKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Outcome of a relayed call, reduced to what the router branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// No session token; the call was never attempted.
    #[error("no session token, call not attempted")]
    Unauthenticated,

    /// Upstream rejected the token (401). The router must force the session
    /// back to anonymous.
    #[error("session token rejected by upstream")]
    SessionExpired,

    /// A write was attempted and refused.
    #[error("upstream rejected the write (status {0})")]
    Rejected(u16),

    /// Backend error on an authenticated read, distinct from an empty
    /// result set.
    #[error("upstream failure: {0}")]
    Upstream(UpstreamKind),
}

pub struct ResourceProxy {
    transport: Arc<dyn ApiTransport>,
}

impl ResourceProxy {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Plates registered by the current account.
    pub async fn fetch_plates(&self, token: Option<&str>) -> Result<Vec<PlateEntry>, RelayError> {
        self.fetch_list(token, "/plates/").await
    }

    /// Gate access log, admin view.
    pub async fn fetch_admin_logs(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<AdminLogEntry>, RelayError> {
        self.fetch_list(token, "/admin/logs").await
    }

    /// All plates with their owners, admin view.
    pub async fn fetch_admin_plates(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<AdminPlateEntry>, RelayError> {
        self.fetch_list(token, "/admin/plates").await
    }

    /// Register a new plate for the current account.
    pub async fn create_plate(
        &self,
        token: Option<&str>,
        plate_number: &str,
    ) -> Result<(), RelayError> {
        let token = token.ok_or(RelayError::Unauthenticated)?;

        let request = ApiRequest::post(
            "/plates/",
            ApiBody::Json(serde_json::json!({ "plate_number": plate_number })),
        )
        .with_bearer(token);

        let response = self.transport.send(request).await.map_err(map_transport)?;

        match response.status {
            401 => Err(RelayError::SessionExpired),
            s if (200..300).contains(&s) => Ok(()),
            s => {
                debug!(status = s, "upstream refused plate creation");
                Err(RelayError::Rejected(s))
            }
        }
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        token: Option<&str>,
        path: &str,
    ) -> Result<Vec<T>, RelayError> {
        let token = token.ok_or(RelayError::Unauthenticated)?;

        let response = self
            .transport
            .send(ApiRequest::get(path, token))
            .await
            .map_err(map_transport)?;

        if response.status == 401 {
            return Err(RelayError::SessionExpired);
        }
        if !response.is_success() {
            warn!(path, status = response.status, "upstream returned an error status");
            return Err(RelayError::Upstream(UpstreamKind::Status(response.status)));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            warn!(path, error = %e, "upstream returned an unparseable body");
            RelayError::Upstream(UpstreamKind::MalformedBody)
        })
    }
}

fn map_transport(failure: TransportFailure) -> RelayError {
    match failure {
        TransportFailure::Timeout => RelayError::Upstream(UpstreamKind::Timeout),
        TransportFailure::Unreachable(detail) => {
            warn!(error = %detail, "upstream unreachable");
            RelayError::Upstream(UpstreamKind::Unreachable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::testing::MockTransport;
    use crate::upstream::ApiMethod;

    fn proxy(transport: &Arc<MockTransport>) -> ResourceProxy {
        ResourceProxy::new(Arc::clone(transport) as Arc<dyn ApiTransport>)
    }

    #[tokio::test]
    async fn test_no_token_short_circuits_without_a_call() {
        let transport = Arc::new(MockTransport::new());

        let result = proxy(&transport).fetch_plates(None).await;
        assert_eq!(result.unwrap_err(), RelayError::Unauthenticated);
        assert_eq!(transport.call_count(), 0);

        let result = proxy(&transport).create_plate(None, "34ABC34").await;
        assert_eq!(result.unwrap_err(), RelayError::Unauthenticated);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bearer_token_attached_to_reads() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, "[]");

        proxy(&transport).fetch_plates(Some("tok-9")).await.unwrap();

        let calls = transport.recorded_calls();
        assert_eq!(calls[0].method, ApiMethod::Get);
        assert_eq!(calls[0].path, "/plates/");
        assert_eq!(calls[0].bearer.as_deref(), Some("tok-9"));
    }

    #[tokio::test]
    async fn test_empty_list_is_success_not_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, "[]");
        let plates = proxy(&transport).fetch_plates(Some("tok")).await.unwrap();
        assert!(plates.is_empty());

        // Same route, backend error: observably distinct outcome.
        let transport = Arc::new(MockTransport::new());
        transport.push_response(500, "internal error");
        let err = proxy(&transport).fetch_plates(Some("tok")).await.unwrap_err();
        assert_eq!(err, RelayError::Upstream(UpstreamKind::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"not":"a list"}"#);
        let err = proxy(&transport).fetch_plates(Some("tok")).await.unwrap_err();
        assert_eq!(err, RelayError::Upstream(UpstreamKind::MalformedBody));
    }

    #[tokio::test]
    async fn test_401_maps_to_session_expired() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(401, r#"{"detail":"token expired"}"#);
        let err = proxy(&transport)
            .fetch_admin_logs(Some("stale"))
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::SessionExpired);

        let transport = Arc::new(MockTransport::new());
        transport.push_response(401, "");
        let err = proxy(&transport)
            .create_plate(Some("stale"), "34ABC34")
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::SessionExpired);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_subkind() {
        let transport = Arc::new(MockTransport::new());
        transport.push_failure(TransportFailure::Timeout);
        let err = proxy(&transport).fetch_plates(Some("tok")).await.unwrap_err();
        assert_eq!(err, RelayError::Upstream(UpstreamKind::Timeout));
    }

    #[tokio::test]
    async fn test_create_plate_relays_exact_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(201, "");

        proxy(&transport)
            .create_plate(Some("tok"), "34ABC34")
            .await
            .unwrap();

        let calls = transport.recorded_calls();
        assert_eq!(calls[0].method, ApiMethod::Post);
        assert_eq!(calls[0].path, "/plates/");
        match &calls[0].body {
            Some(ApiBody::Json(value)) => {
                assert_eq!(value, &serde_json::json!({"plate_number": "34ABC34"}));
            }
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_write_is_rejected() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(422, r#"{"detail":"duplicate plate"}"#);
        let err = proxy(&transport)
            .create_plate(Some("tok"), "34ABC34")
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::Rejected(422));
    }

    #[tokio::test]
    async fn test_admin_endpoints_parse_documented_shapes() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            200,
            r#"[{"id":1,"plate_number":"34ABC34","access_status":true,
                 "vlm_description":"white sedan","timestamp":"2026-08-01T10:00:00",
                 "related_user":"alice"}]"#,
        );
        let logs = proxy(&transport).fetch_admin_logs(Some("tok")).await.unwrap();
        assert_eq!(logs[0].plate_number, "34ABC34");
        assert!(logs[0].access_status);

        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            200,
            r#"[{"id":7,"plate_number":"06XYZ06","created_at":"2026-07-01T09:30:00",
                 "owner_username":"bob"}]"#,
        );
        let plates = proxy(&transport)
            .fetch_admin_plates(Some("tok"))
            .await
            .unwrap();
        assert_eq!(plates[0].owner_username, "bob");
    }
}
