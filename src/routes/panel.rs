//! Panel routes
//!
//! Every panel re-runs the authorization guard before anything else, since a
//! client can navigate straight to any URL and bypass the post-login
//! dispatch. Only an Allow decision ever reaches the resource proxy.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{decide, initial_panel, Decision, Panel, Role};
use crate::proxy::RelayError;
use crate::routes::{append_query, parse_form_body, query_param, LOGIN_PATH};
use crate::server::http::{expired_cookie, json_response, see_other, see_other_with_cookie};
use crate::server::AppState;
use crate::session::SessionContext;

/// GET /panel/*
pub async fn handle_panel(
    state: &AppState,
    ctx: &SessionContext,
    panel: Panel,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    match decide(ctx.role(), panel) {
        // Authorization denials are silent redirects, no error text.
        Decision::RedirectToLogin => see_other(LOGIN_PATH),
        Decision::RedirectToPanel(target) => see_other(target.path()),
        Decision::Allow => render_panel(state, ctx, panel, query).await,
    }
}

async fn render_panel(
    state: &AppState,
    ctx: &SessionContext,
    panel: Panel,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let token = ctx.token();

    let records = match panel {
        // The dashboard is a static landing view; no resource fetch.
        Panel::AdminDashboard => None,
        Panel::Resident | Panel::Security => match state.proxy.fetch_plates(token).await {
            Ok(plates) => Some(("plates", serde_json::json!(plates))),
            Err(e) => return relay_failure(state, ctx, panel, e),
        },
        Panel::AdminLogs => match state.proxy.fetch_admin_logs(token).await {
            Ok(logs) => Some(("logs", serde_json::json!(logs))),
            Err(e) => return relay_failure(state, ctx, panel, e),
        },
        Panel::AdminPlates => match state.proxy.fetch_admin_plates(token).await {
            Ok(plates) => Some(("plates", serde_json::json!(plates))),
            Err(e) => return relay_failure(state, ctx, panel, e),
        },
    };

    let mut body = serde_json::json!({
        "panel": panel.view_name(),
        "username": ctx.username(),
        "role": ctx.role(),
    });
    if let Some((key, value)) = records {
        body[key] = value;
    }
    // Acknowledgment tokens carried through the post-write redirect.
    match query_param(query, "notice") {
        Some("plate-added") => body["notice"] = "Plate added.".into(),
        Some("plate-failed") => body["notice"] = "Could not add the plate.".into(),
        _ => {}
    }

    json_response(StatusCode::OK, &body)
}

/// Map a relay failure on a read to the response the view layer expects.
fn relay_failure(
    state: &AppState,
    ctx: &SessionContext,
    panel: Panel,
    error: RelayError,
) -> Response<Full<Bytes>> {
    match error {
        RelayError::SessionExpired => {
            info!(panel = panel.view_name(), "upstream rejected session token, forcing logout");
            session_expired_redirect(state, ctx)
        }
        RelayError::Unauthenticated => see_other(LOGIN_PATH),
        RelayError::Rejected(_) | RelayError::Upstream(_) => {
            warn!(panel = panel.view_name(), error = %error, "upstream failure on panel fetch");
            // Explicit error state, never conflated with an empty result.
            json_response(
                StatusCode::BAD_GATEWAY,
                &serde_json::json!({
                    "panel": panel.view_name(),
                    "error": "upstream-unavailable",
                }),
            )
        }
    }
}

/// Force the session back to anonymous after a mid-session 401.
fn session_expired_redirect(state: &AppState, ctx: &SessionContext) -> Response<Full<Bytes>> {
    if let Some(id) = ctx.session_id {
        state.sessions.remove(id);
    }
    let location = format!("{LOGIN_PATH}?notice=session-expired");
    see_other_with_cookie(&location, &expired_cookie(&state.args))
}

#[derive(Debug, Deserialize)]
pub struct AddPlateForm {
    #[serde(rename = "plateNumber", default)]
    pub plate_number: String,
    #[serde(rename = "returnUrl", default)]
    pub return_url: String,
}

/// POST /panel/add-plate
pub async fn handle_add_plate(
    req: Request<Incoming>,
    state: Arc<AppState>,
    ctx: &SessionContext,
) -> Response<Full<Bytes>> {
    let form: AddPlateForm = match parse_form_body(req).await {
        Ok(f) => f,
        Err(_) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({"error": "Malformed form body"}),
            );
        }
    };

    add_plate_flow(&state, ctx, form).await
}

pub(crate) async fn add_plate_flow(
    state: &AppState,
    ctx: &SessionContext,
    form: AddPlateForm,
) -> Response<Full<Bytes>> {
    let role = match ctx.role() {
        Some(r) => r,
        None => return see_other(LOGIN_PATH),
    };

    let back = sanitize_return_url(&form.return_url, role);
    let plate = form.plate_number.trim();
    if plate.is_empty() {
        return see_other(&append_query(&back, "notice", "plate-failed"));
    }

    match state.proxy.create_plate(ctx.token(), plate).await {
        Ok(()) => {
            info!(plate, "plate registered");
            see_other(&append_query(&back, "notice", "plate-added"))
        }
        Err(RelayError::SessionExpired) => session_expired_redirect(state, ctx),
        Err(RelayError::Unauthenticated) => see_other(LOGIN_PATH),
        Err(e) => {
            warn!(plate, error = %e, "plate registration failed");
            see_other(&append_query(&back, "notice", "plate-failed"))
        }
    }
}

/// Only local absolute paths are honored as post-write return targets;
/// anything else falls back to the role's own panel.
fn sanitize_return_url(raw: &str, role: Role) -> String {
    let is_local = raw.starts_with('/')
        && !raw.starts_with("//")
        && raw.chars().all(|c| c.is_ascii_graphic());
    if is_local {
        raw.to_string()
    } else {
        initial_panel(role).path().to_string()
    }
}
