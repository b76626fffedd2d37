//! Account routes: login and logout
//!
//! The gateway emits view-model JSON; HTML rendering belongs to the view
//! layer. A failed login always answers HTTP 200 with the login view and one
//! generic message, whatever actually went wrong upstream.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{initial_panel, AuthError};
use crate::routes::{parse_form_body, query_param};
use crate::server::http::{
    expired_cookie, json_response, see_other_with_cookie, session_cookie,
};
use crate::server::AppState;
use crate::session::SessionContext;

pub const LOGIN_PATH: &str = "/account/login";

/// Single generic message for any failed credential exchange.
const BAD_LOGIN_MESSAGE: &str = "Invalid username or password.";
/// Generic connectivity message; never carries transport detail.
const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the authentication service. Please try again shortly.";
/// Shown after a mid-session token rejection; distinct from a fresh
/// credential failure.
const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";
const SIGNED_OUT_MESSAGE: &str = "You have been signed out.";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// View model for the login page.
#[derive(Debug, Serialize)]
struct LoginView {
    view: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

fn login_view(error: Option<&'static str>, notice: Option<&'static str>) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &LoginView {
            view: "login",
            error,
            notice,
        },
    )
}

/// GET /account/login
///
/// Only recognized notice tokens are reflected; arbitrary query input never
/// reaches the view.
pub fn login_page(query: Option<&str>) -> Response<Full<Bytes>> {
    let notice = match query_param(query, "notice") {
        Some("session-expired") => Some(SESSION_EXPIRED_MESSAGE),
        Some("signed-out") => Some(SIGNED_OUT_MESSAGE),
        _ => None,
    };
    login_view(None, notice)
}

/// POST /account/login
pub async fn handle_login_submit(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let form: LoginForm = match parse_form_body(req).await {
        Ok(f) => f,
        Err(_) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": "Malformed login form"}),
            );
        }
    };

    login_flow(&state, &form.username, &form.password).await
}

/// Exchange credentials, and only on full success commit a session and
/// redirect to the role's initial panel. A cancelled or failed login writes
/// nothing.
pub(crate) async fn login_flow(
    state: &AppState,
    username: &str,
    password: &str,
) -> Response<Full<Bytes>> {
    match state.auth.login(username, password).await {
        Ok(outcome) => {
            let session = state
                .sessions
                .create(username, outcome.role, outcome.access_token);
            info!(username, role = %outcome.role, "login succeeded");

            let cookie = session_cookie(&state.args, &session.session_id);
            see_other_with_cookie(initial_panel(outcome.role).path(), &cookie)
        }
        Err(AuthError::InvalidCredentials) => {
            info!(username, "login rejected");
            login_view(Some(BAD_LOGIN_MESSAGE), None)
        }
        Err(AuthError::Transport) => login_view(Some(CONNECTIVITY_MESSAGE), None),
    }
}

/// GET /account/logout
///
/// Unconditionally clears the session record and the cookie; logging out an
/// already-anonymous session is a no-op, not an error.
pub fn handle_logout(state: &AppState, ctx: &SessionContext) -> Response<Full<Bytes>> {
    if let Some(id) = ctx.session_id {
        state.sessions.remove(id);
    }
    let location = format!("{LOGIN_PATH}?notice=signed-out");
    see_other_with_cookie(&location, &expired_cookie(&state.args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::Args;
    use crate::upstream::testing::MockTransport;
    use crate::upstream::ApiTransport;
    use clap::Parser;

    fn state_with(transport: &Arc<MockTransport>) -> AppState {
        let args = Args::parse_from(["gatehouse"]);
        AppState::with_transport(args, Arc::clone(transport) as Arc<dyn ApiTransport>)
    }

    fn header<'a>(resp: &'a Response<Full<Bytes>>, name: &str) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_admin_login_redirects_to_dashboard_with_cookie() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"access_token":"tok","role":"Admin"}"#);
        let state = state_with(&transport);

        let resp = login_flow(&state, "alice", "secret").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(header(&resp, "location"), Some("/panel/admin-dashboard"));
        assert!(header(&resp, "set-cookie").unwrap().starts_with("gatehouse_session="));
        assert_eq!(state.sessions.active_count(), 1);
    }

    #[tokio::test]
    async fn test_initial_panel_follows_role() {
        for (role, path) in [
            ("Security", "/panel/security"),
            ("Resident", "/panel/resident"),
            ("Visitor", "/panel/resident"),
        ] {
            let transport = Arc::new(MockTransport::new());
            transport.push_response(
                200,
                &format!(r#"{{"access_token":"tok","role":"{role}"}}"#),
            );
            let state = state_with(&transport);

            let resp = login_flow(&state, "user", "pw").await;
            assert_eq!(header(&resp, "location"), Some(path));
        }
    }

    #[tokio::test]
    async fn test_bad_credentials_render_login_view_http_200() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(401, r#"{"detail":"nope"}"#);
        let state = state_with(&transport);

        let resp = login_flow(&state, "alice", "wrong").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(header(&resp, "set-cookie").is_none());
        assert_eq!(state.sessions.active_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_renders_generic_connectivity_message() {
        let transport = Arc::new(MockTransport::new());
        transport.push_failure(crate::upstream::TransportFailure::Unreachable(
            "connection refused to 10.0.0.5:8000".into(),
        ));
        let state = state_with(&transport);

        let resp = login_flow(&state, "alice", "pw").await;
        assert_eq!(resp.status(), StatusCode::OK);
        // The raw transport detail must never appear in the body.
        let body = format!("{:?}", resp.body());
        assert!(!body.contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_cookie() {
        let transport = Arc::new(MockTransport::new());
        let state = state_with(&transport);
        let session = state.sessions.create("alice", Role::Admin, "tok".to_string());
        let ctx = state.sessions.resolve(Some(session.session_id));

        let resp = handle_logout(&state, &ctx);
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(header(&resp, "set-cookie").unwrap().contains("Max-Age=0"));
        assert_eq!(state.sessions.active_count(), 0);

        // Second logout on the now-anonymous session is still a clean redirect.
        let ctx = state.sessions.resolve(Some(session.session_id));
        let resp = handle_logout(&state, &ctx);
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_login_page_reflects_only_known_notices() {
        let resp = login_page(Some("notice=session-expired"));
        let body = format!("{:?}", resp.body());
        assert!(body.contains("session has expired"));

        let resp = login_page(Some("notice=%3Cscript%3E"));
        let body = format!("{:?}", resp.body());
        assert!(!body.contains("script"));
    }
}
