//! Authentication and authorization for Gatehouse
//!
//! Provides:
//! - Credential/token exchange against the upstream identity API
//! - The role policy table for panel routing

pub mod gateway;
pub mod guard;

pub use gateway::{AuthError, AuthGateway, LoginSuccess};
pub use guard::{decide, initial_panel, Decision, Panel, Role};
