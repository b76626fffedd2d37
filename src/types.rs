//! Shared error type for Gatehouse

use thiserror::Error;

/// Top-level error type for infrastructure failures.
///
/// Domain outcomes (bad credentials, upstream failures, authorization
/// denials) are modeled as explicit result enums in `auth` and `proxy`;
/// this type only covers failures of the gateway process itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
