//! Route permission map and default route resolution.
//!
//! The table is static; a path matches an entry when it equals the entry path or
//! continues it with a `/` segment. The longest matching entry wins, so
//! `/tasks/approvals` overrides `/tasks`. Paths with no entry carry no restriction.

use serde::Serialize;

use crate::identity::{normalize_role, CanonicalRole};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const OVERVIEW_PATH: &str = "/overview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutePermissionEntry {
    pub path: &'static str,
    pub title: &'static str,
    /// `None` means any signed-in user may open the route.
    pub allowed_roles: Option<&'static [CanonicalRole]>,
}

impl RoutePermissionEntry {
    pub fn allows(&self, role: CanonicalRole) -> bool {
        match self.allowed_roles {
            Some(roles) => roles.contains(&role),
            None => true,
        }
    }

    fn matches(&self, path: &str) -> bool {
        path == self.path
            || path
                .strip_prefix(self.path)
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
    }
}

use CanonicalRole::{Admin, Director, Leader, Pmo, Staff};

pub static ROUTE_PERMISSIONS: &[RoutePermissionEntry] = &[
    RoutePermissionEntry { path: DASHBOARD_PATH, title: "Dashboard", allowed_roles: Some(&[Admin, Director, Pmo]) },
    RoutePermissionEntry { path: OVERVIEW_PATH, title: "My overview", allowed_roles: Some(&[Leader, Staff]) },
    RoutePermissionEntry { path: "/users", title: "Users", allowed_roles: Some(&[Admin]) },
    RoutePermissionEntry { path: "/departments", title: "Departments", allowed_roles: Some(&[Admin]) },
    RoutePermissionEntry { path: "/projects", title: "Projects", allowed_roles: Some(&[Admin, Director, Pmo, Leader, Staff]) },
    RoutePermissionEntry { path: "/tasks", title: "Tasks", allowed_roles: Some(&[Director, Pmo, Leader, Staff]) },
    RoutePermissionEntry { path: "/tasks/approvals", title: "Task approvals", allowed_roles: Some(&[Pmo, Leader]) },
    RoutePermissionEntry { path: "/reports", title: "Reports", allowed_roles: Some(&[Admin, Director, Pmo]) },
    RoutePermissionEntry { path: "/system-logs", title: "System logs", allowed_roles: Some(&[Admin]) },
    RoutePermissionEntry { path: "/profile", title: "Profile", allowed_roles: None },
];

/// Strip a trailing slash (except for the root) so `/users/` and `/users` agree.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Entry governing `path`, if any.
pub fn route_entry(path: &str) -> Option<&'static RoutePermissionEntry> {
    let path = normalize_path(path);
    ROUTE_PERMISSIONS
        .iter()
        .filter(|e| e.matches(path))
        .max_by_key(|e| e.path.len())
}

/// Allowed roles for `path`; `None` when the path declares no restriction.
pub fn allowed_roles_for(path: &str) -> Option<&'static [CanonicalRole]> {
    route_entry(path).and_then(|e| e.allowed_roles)
}

pub fn is_route_allowed(path: &str, role: CanonicalRole) -> bool {
    route_entry(path).map(|e| e.allows(role)).unwrap_or(true)
}

/// Routes a role may open, in table order. Used for navigation menus.
pub fn routes_for_role(role: CanonicalRole) -> Vec<&'static RoutePermissionEntry> {
    ROUTE_PERMISSIONS.iter().filter(|e| e.allows(role)).collect()
}

pub fn default_route_for_role(role: CanonicalRole) -> &'static str {
    match role {
        Admin | Pmo | Director => DASHBOARD_PATH,
        Leader | Staff => OVERVIEW_PATH,
    }
}

/// Default route for a raw backend token. Unrecognized tokens land on the dashboard.
pub fn default_route_for_raw_role(raw: &str) -> &'static str {
    normalize_role(raw).map(default_route_for_role).unwrap_or(DASHBOARD_PATH)
}
