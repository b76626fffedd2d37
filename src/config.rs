//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// Gatehouse - session-holding gateway for the residential security UI
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "BFF gateway between the security UI and the plate recognition API")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the upstream identity/resource API
    #[arg(long, env = "UPSTREAM_URL", default_value = "http://localhost:8000")]
    pub upstream_url: String,

    /// Per-call timeout for outbound API requests, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Connect timeout for outbound API requests, in milliseconds
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value = "3000")]
    pub connect_timeout_ms: u64,

    /// Server-side session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "3600")]
    pub session_ttl_seconds: u64,

    /// Name of the session cookie
    #[arg(long, env = "SESSION_COOKIE", default_value = "gatehouse_session")]
    pub session_cookie: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration before startup
    pub fn validate(&self) -> Result<(), String> {
        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://") {
            return Err("UPSTREAM_URL must be an http:// or https:// URL".to_string());
        }

        if self.session_ttl_seconds == 0 {
            return Err("SESSION_TTL_SECONDS must be greater than zero".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.session_cookie.is_empty() || self.session_cookie.contains(['=', ';', ' ']) {
            return Err("SESSION_COOKIE must be a valid cookie name".to_string());
        }

        Ok(())
    }
}
