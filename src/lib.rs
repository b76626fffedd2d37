//! Gatehouse - session-holding gateway for the residential security UI
//!
//! Gatehouse sits between the browser-facing view layer and the plate
//! recognition backend. It exchanges user credentials for a bearer token at
//! login, keeps that token in a server-side session, gates the role-specific
//! panels, and relays resource calls upstream with the session's token
//! attached.
//!
//! ## Components
//!
//! - **Session**: in-memory TTL session store keyed by cookie
//! - **Auth**: credential/token exchange and the role policy table
//! - **Proxy**: bearer-authenticated relay to the upstream resource API
//! - **Routes**: account and panel handlers composed per request
//! - **Server**: hyper http1 accept loop and request dispatch

pub mod auth;
pub mod config;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod session;
pub mod types;
pub mod upstream;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
