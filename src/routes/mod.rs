//! HTTP routes for Gatehouse

pub mod account;
pub mod health;
pub mod panel;

pub use account::{handle_login_submit, handle_logout, login_page, LOGIN_PATH};
pub use health::{health_check, version_info};
pub use panel::{handle_add_plate, handle_panel};

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;
use serde::de::DeserializeOwned;

use crate::types::GatewayError;

/// Parse a form-encoded request body, bounded to a sane size.
pub(crate) async fn parse_form_body<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, GatewayError> {
    let body = req
        .collect()
        .await
        .map_err(|e| GatewayError::Http(format!("failed to read body: {e}")))?;

    let bytes: Bytes = body.to_bytes();
    if bytes.len() > 8192 {
        return Err(GatewayError::Http("request body too large".into()));
    }

    serde_urlencoded::from_bytes(&bytes)
        .map_err(|e| GatewayError::Http(format!("invalid form body: {e}")))
}

/// Append a query parameter to a path that may already carry a query string.
pub(crate) fn append_query(path: &str, key: &str, value: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{key}={}", urlencoding::encode(value))
}

/// Extract a single query parameter's value.
pub(crate) fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == key).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_query_on_bare_path() {
        assert_eq!(
            append_query("/panel/resident", "notice", "plate-added"),
            "/panel/resident?notice=plate-added"
        );
    }

    #[test]
    fn test_append_query_on_existing_query() {
        assert_eq!(
            append_query("/panel/resident?tab=2", "notice", "plate-added"),
            "/panel/resident?tab=2&notice=plate-added"
        );
    }

    #[test]
    fn test_query_param_lookup() {
        assert_eq!(query_param(Some("a=1&notice=x"), "notice"), Some("x"));
        assert_eq!(query_param(Some("a=1"), "notice"), None);
        assert_eq!(query_param(None, "notice"), None);
    }
}
