//! Route guard: decides what a protected page shows for the current session.
//!
//! The guard does no I/O. It reads an already-resolved [`Session`] and the static
//! route table, and returns a [`GuardDecision`] for the caller to act on.

use serde::Serialize;
use tracing::debug;

use crate::auth_store::Session;
use crate::identity::CanonicalRole;
use crate::routing::{self, LOGIN_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Loading,
    Unauthenticated,
    AuthenticatedAllowed,
    AuthenticatedDenied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GuardAction {
    /// Session restoration is still in flight.
    ShowLoading,
    /// Navigate away. `replace` drops the current history entry.
    Redirect { to: String, replace: bool },
    /// Render the wrapped page inside the application frame.
    Render,
    /// Inline access-denied notice with a re-login action.
    ShowDenied { role: CanonicalRole, default_route: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardDecision {
    pub state: GuardState,
    pub action: GuardAction,
}

impl GuardDecision {
    fn new(state: GuardState, action: GuardAction) -> Self {
        Self { state, action }
    }

    pub fn renders_page(&self) -> bool {
        self.action == GuardAction::Render
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match &self.action {
            GuardAction::Redirect { to, .. } => Some(to.as_str()),
            _ => None,
        }
    }
}

/// Role restriction a guarded page declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    /// Look the path up in the route permission map.
    RouteTable,
    /// Explicit allowed-role set supplied by the page.
    Roles(&'static [CanonicalRole]),
    /// Any signed-in user.
    None,
}

impl Restriction {
    fn allows(&self, path: &str, role: CanonicalRole) -> bool {
        match self {
            Restriction::RouteTable => routing::is_route_allowed(path, role),
            Restriction::Roles(roles) => roles.contains(&role),
            Restriction::None => true,
        }
    }
}

/// Evaluate the guard for `path` using the route permission map.
pub fn evaluate(session: &Session, path: &str) -> GuardDecision {
    evaluate_with(session, path, Restriction::RouteTable)
}

pub fn evaluate_with(session: &Session, path: &str, restriction: Restriction) -> GuardDecision {
    if session.is_loading {
        return GuardDecision::new(GuardState::Loading, GuardAction::ShowLoading);
    }
    let Some(user) = session.user.as_ref() else {
        debug!(target: "guard", path, "no session, redirecting to login");
        return GuardDecision::new(
            GuardState::Unauthenticated,
            GuardAction::Redirect { to: LOGIN_PATH.to_string(), replace: true },
        );
    };
    let path = routing::normalize_path(path);
    if restriction.allows(path, user.role) {
        return GuardDecision::new(GuardState::AuthenticatedAllowed, GuardAction::Render);
    }
    let default_route = routing::default_route_for_role(user.role);
    debug!(target: "guard", path, role = %user.role, default_route, "route denied");
    // Never redirect to the path being evaluated.
    if path == default_route {
        GuardDecision::new(
            GuardState::AuthenticatedDenied,
            GuardAction::ShowDenied { role: user.role, default_route: default_route.to_string() },
        )
    } else {
        GuardDecision::new(
            GuardState::AuthenticatedDenied,
            GuardAction::Redirect { to: default_route.to_string(), replace: true },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{User, UserStatus};

    fn session_for(role: CanonicalRole) -> Session {
        Session {
            user: Some(User {
                id: "1".into(),
                username: "t".into(),
                display_name: "T".into(),
                role,
                department_ref: None,
                status: UserStatus::Active,
                avatar_ref: None,
            }),
            is_loading: false,
        }
    }

    #[test]
    fn loading_shows_placeholder_only() {
        let d = evaluate(&Session { user: None, is_loading: true }, "/users");
        assert_eq!(d.state, GuardState::Loading);
        assert_eq!(d.action, GuardAction::ShowLoading);
    }

    #[test]
    fn unauthenticated_goes_to_login_with_replace() {
        let d = evaluate(&Session::default(), "/users");
        assert_eq!(d.state, GuardState::Unauthenticated);
        assert_eq!(d.action, GuardAction::Redirect { to: "/login".into(), replace: true });
        assert!(!d.renders_page());
    }

    #[test]
    fn pmo_denied_departments_redirects_to_dashboard() {
        let d = evaluate(&session_for(CanonicalRole::Pmo), "/departments");
        assert_eq!(d.state, GuardState::AuthenticatedDenied);
        assert_eq!(d.redirect_target(), Some("/dashboard"));
    }

    #[test]
    fn denied_on_own_landing_shows_notice() {
        let s = session_for(CanonicalRole::Staff);
        let d = evaluate_with(&s, "/overview", Restriction::Roles(&[CanonicalRole::Admin]));
        assert_eq!(d.state, GuardState::AuthenticatedDenied);
        assert_eq!(
            d.action,
            GuardAction::ShowDenied { role: CanonicalRole::Staff, default_route: "/overview".into() }
        );
    }

    #[test]
    fn trailing_slash_does_not_dodge_loop_check() {
        let s = session_for(CanonicalRole::Leader);
        let d = evaluate_with(&s, "/overview/", Restriction::Roles(&[CanonicalRole::Pmo]));
        assert!(matches!(d.action, GuardAction::ShowDenied { .. }));
    }

    #[test]
    fn unrestricted_page_renders_for_everyone() {
        for role in CanonicalRole::ALL {
            assert!(evaluate_with(&session_for(role), "/anything", Restriction::None).renders_page());
            assert!(evaluate(&session_for(role), "/profile").renders_page());
        }
    }

    #[test]
    fn guard_property_over_table() {
        for entry in routing::ROUTE_PERMISSIONS {
            for role in CanonicalRole::ALL {
                let d = evaluate(&session_for(role), entry.path);
                if entry.allows(role) {
                    assert!(d.renders_page(), "{} {}", entry.path, role);
                } else if entry.path != routing::default_route_for_role(role) {
                    assert_eq!(d.redirect_target(), Some(routing::default_route_for_role(role)));
                } else {
                    assert!(matches!(d.action, GuardAction::ShowDenied { .. }));
                }
                assert_ne!(d.redirect_target(), Some(entry.path));
            }
        }
    }
}
