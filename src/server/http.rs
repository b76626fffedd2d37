//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one spawned task per connection, so a slow
//! upstream call never blocks other sessions' handlers. The session context
//! is resolved exactly once per request, at the top of `handle_request`, and
//! threaded into every handler.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::{AuthGateway, Panel};
use crate::config::Args;
use crate::proxy::ResourceProxy;
use crate::routes;
use crate::session::{self, SessionStore};
use crate::types::GatewayError;
use crate::upstream::{ApiTransport, HttpTransport};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Server-side session records, keyed by the cookie's session id.
    pub sessions: Arc<SessionStore>,
    /// Credential/token exchange against the identity API.
    pub auth: AuthGateway,
    /// Bearer-authenticated relay to the resource API.
    pub proxy: ResourceProxy,
}

impl AppState {
    /// Create AppState with the production reqwest transport.
    pub fn new(args: Args) -> Result<Self, GatewayError> {
        let transport: Arc<dyn ApiTransport> = Arc::new(HttpTransport::from_args(&args)?);
        Ok(Self::with_transport(args, transport))
    }

    /// Create AppState with an injected transport. AuthGateway and
    /// ResourceProxy share one transport so tests can script and observe
    /// every outbound call.
    pub fn with_transport(args: Args, transport: Arc<dyn ApiTransport>) -> Self {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            args.session_ttl_seconds,
        )));
        Self {
            args,
            sessions,
            auth: AuthGateway::new(Arc::clone(&transport)),
            proxy: ResourceProxy::new(transport),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Gatehouse listening on {}", state.args.listen);
    info!("Upstream API: {}", state.args.upstream_url);

    session::spawn_cleanup_task(Arc::clone(&state.sessions));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    // Resolve the session once; handlers never re-read mid-request.
    let session_id = session_id_from_cookie(&req, &state.args.session_cookie);
    let ctx = state.sessions.resolve(session_id);

    info!(
        "[{}] {} {} (session: {})",
        addr,
        method,
        path,
        if ctx.session.is_some() { "authenticated" } else { "anonymous" }
    );

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Account routes
        (Method::GET, "/account/login") => routes::login_page(query.as_deref()),
        (Method::POST, "/account/login") => {
            return Ok(to_boxed(
                routes::handle_login_submit(req, Arc::clone(&state)).await,
            ));
        }
        (Method::GET, "/account/logout") => routes::handle_logout(&state, &ctx),

        // Panel routes - each one re-runs the authorization guard.
        (Method::GET, "/panel/resident") => {
            routes::handle_panel(&state, &ctx, Panel::Resident, query.as_deref()).await
        }
        (Method::GET, "/panel/security") => {
            routes::handle_panel(&state, &ctx, Panel::Security, query.as_deref()).await
        }
        (Method::GET, "/panel/admin-dashboard") => {
            routes::handle_panel(&state, &ctx, Panel::AdminDashboard, query.as_deref()).await
        }
        (Method::GET, "/panel/admin-logs") => {
            routes::handle_panel(&state, &ctx, Panel::AdminLogs, query.as_deref()).await
        }
        (Method::GET, "/panel/admin-plates") => {
            routes::handle_panel(&state, &ctx, Panel::AdminPlates, query.as_deref()).await
        }
        (Method::POST, "/panel/add-plate") => {
            return Ok(to_boxed(
                routes::handle_add_plate(req, Arc::clone(&state), &ctx).await,
            ));
        }

        // Default landing page is the login view.
        (Method::GET, "/") => see_other(routes::LOGIN_PATH),

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

/// Extract the session id from the request's cookie header.
fn session_id_from_cookie(req: &Request<Incoming>, cookie_name: &str) -> Option<Uuid> {
    let header = req.headers().get(hyper::header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == cookie_name {
            Uuid::parse_str(value).ok()
        } else {
            None
        }
    })
}

/// Set-Cookie value for a fresh session.
pub(crate) fn session_cookie(args: &Args, session_id: &Uuid) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        args.session_cookie, session_id, args.session_ttl_seconds
    )
}

/// Set-Cookie value that clears the session cookie.
pub(crate) fn expired_cookie(args: &Args) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", args.session_cookie)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// JSON response with the given status
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// 303 redirect
pub(crate) fn see_other(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header("Location", location)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// 303 redirect that also sets a cookie
pub(crate) fn see_other_with_cookie(location: &str, cookie: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header("Location", location)
        .header("Set-Cookie", cookie)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_session_cookie_roundtrip_format() {
        let args = Args::parse_from(["gatehouse"]);
        let id = Uuid::new_v4();
        let cookie = session_cookie(&args, &id);
        assert!(cookie.starts_with(&format!("gatehouse_session={id}")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_expired_cookie_clears_value() {
        let args = Args::parse_from(["gatehouse"]);
        let cookie = expired_cookie(&args);
        assert!(cookie.starts_with("gatehouse_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
