//! Upstream API wire types
//!
//! These mirror the documented request/response shapes of the backend. The
//! gateway relays them for the view layer and does not validate or compute
//! over their fields, so timestamps stay as the strings the API sends.

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub role: String,
}

/// One entry of `GET /plates/` - a plate registered by the current user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateEntry {
    pub id: i64,
    pub plate_number: String,
    pub created_at: String,
    pub user_id: i64,
}

/// One entry of `GET /admin/logs` - a gate access event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub id: i64,
    pub plate_number: String,
    pub access_status: bool,
    pub vlm_description: String,
    pub timestamp: String,
    pub related_user: String,
}

/// One entry of `GET /admin/plates` - a plate with its owning account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPlateEntry {
    pub id: i64,
    pub plate_number: String,
    pub created_at: String,
    pub owner_username: String,
}
