//! Role policy for panel routing
//!
//! Every protected route runs `decide` before touching the upstream API;
//! the policy is a single pure function so the whole table is reviewable in
//! one place. Redirect decisions never mutate session state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated session, as assigned by the identity API at
/// login. The gateway never re-derives or upgrades a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Resident,
    Security,
    Admin,
}

impl Role {
    /// Map the upstream role string. The identity API guarantees "Admin" and
    /// "Security"; any other role is a resident account.
    pub fn from_upstream(raw: &str) -> Role {
        match raw {
            "Admin" => Role::Admin,
            "Security" => Role::Security,
            _ => Role::Resident,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Resident => write!(f, "Resident"),
            Role::Security => write!(f, "Security"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// The role-specific panels served by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Resident,
    Security,
    AdminDashboard,
    AdminLogs,
    AdminPlates,
}

impl Panel {
    /// Gateway-facing route for this panel.
    pub fn path(&self) -> &'static str {
        match self {
            Panel::Resident => "/panel/resident",
            Panel::Security => "/panel/security",
            Panel::AdminDashboard => "/panel/admin-dashboard",
            Panel::AdminLogs => "/panel/admin-logs",
            Panel::AdminPlates => "/panel/admin-plates",
        }
    }

    /// View identifier handed to the rendering layer.
    pub fn view_name(&self) -> &'static str {
        match self {
            Panel::Resident => "resident",
            Panel::Security => "security",
            Panel::AdminDashboard => "admin-dashboard",
            Panel::AdminLogs => "admin-logs",
            Panel::AdminPlates => "admin-plates",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToPanel(Panel),
}

/// Authorization policy table. `None` is an anonymous session (no token) and
/// is always sent to login regardless of the panel.
///
/// The admin list/log panels share the dashboard's gate; security staff see
/// their own panel instead of the resident one, and residents are bounced
/// off the security panel back to theirs.
pub fn decide(role: Option<Role>, panel: Panel) -> Decision {
    let role = match role {
        Some(r) => r,
        None => return Decision::RedirectToLogin,
    };

    match panel {
        Panel::Resident => match role {
            Role::Resident | Role::Admin => Decision::Allow,
            Role::Security => Decision::RedirectToPanel(Panel::Security),
        },
        Panel::Security => match role {
            Role::Security | Role::Admin => Decision::Allow,
            Role::Resident => Decision::RedirectToPanel(Panel::Resident),
        },
        Panel::AdminDashboard | Panel::AdminLogs | Panel::AdminPlates => match role {
            Role::Admin | Role::Security => Decision::Allow,
            Role::Resident => Decision::RedirectToLogin,
        },
    }
}

/// Panel a user lands on right after login, selected solely by role.
pub fn initial_panel(role: Role) -> Panel {
    match role {
        Role::Admin => Panel::AdminDashboard,
        Role::Security => Panel::Security,
        Role::Resident => Panel::Resident,
    }
}
