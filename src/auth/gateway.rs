//! Credential/token exchange against the identity API
//!
//! The gateway posts form-encoded credentials to the upstream `/login` and
//! expects a JSON body carrying the bearer token and the account's role.
//! Every rejection collapses into one generic outcome so a caller cannot
//! probe which of status, body shape, or token presence failed.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::guard::Role;
use crate::upstream::models::TokenResponse;
use crate::upstream::{ApiBody, ApiRequest, ApiTransport};

/// Result of a successful login exchange. The caller (router) writes it
/// into the session store; the gateway itself holds no state.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub access_token: String,
    pub role: Role,
}

/// Login failure, already reduced to what the user may see.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Bad credentials or a malformed token response. One message for all
    /// causes; account enumeration must not be possible.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Identity API unreachable or timed out. Surfaced as a generic
    /// connectivity message, never the raw transport error.
    #[error("could not reach the authentication service")]
    Transport,
}

pub struct AuthGateway {
    transport: Arc<dyn ApiTransport>,
}

impl AuthGateway {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Exchange credentials for a bearer token and role.
    ///
    /// Success requires a 2xx status AND a parseable body AND a non-empty
    /// `access_token`; anything else is `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, AuthError> {
        let request = ApiRequest::post(
            "/login",
            ApiBody::Form(vec![
                ("username", username.to_string()),
                ("password", password.to_string()),
            ]),
        );

        let response = match self.transport.send(request).await {
            Ok(r) => r,
            Err(failure) => {
                warn!(error = %failure, "identity API unreachable during login");
                return Err(AuthError::Transport);
            }
        };

        if !response.is_success() {
            debug!(status = response.status, "login rejected by identity API");
            return Err(AuthError::InvalidCredentials);
        }

        let token: TokenResponse = match serde_json::from_slice(&response.body) {
            Ok(t) => t,
            Err(_) => {
                warn!("identity API returned an unparseable login response");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if token.access_token.is_empty() {
            warn!("identity API returned a login response without a token");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(LoginSuccess {
            access_token: token.access_token,
            role: Role::from_upstream(&token.role),
        })
    }
}
