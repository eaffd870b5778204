//! Route guard decisions derived from a session snapshot.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::User;
use crate::state::session::SessionSnapshot;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_HOME: &str = "/admin";
pub const USER_HOME: &str = "/dashboard";

/// What a protected view should do with the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session not resolved yet; show a loading state.
    Wait,
    Allow,
    Redirect(String),
}

/// Initialized, idle, and nobody signed in.
#[must_use]
pub fn should_redirect_unauth(snapshot: &SessionSnapshot) -> bool {
    snapshot.initialized && !snapshot.loading && snapshot.user.is_none()
}

#[must_use]
pub fn login_redirect(path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={path}")
}

/// Where to go after a successful sign-in. Only same-origin absolute paths
/// are honoured.
#[must_use]
pub fn post_login_destination(redirect: Option<&str>, user: Option<&User>) -> String {
    match redirect {
        Some(target) if target.starts_with('/') && !target.starts_with("//") => target.to_owned(),
        _ if user.is_some_and(User::is_admin) => ADMIN_HOME.to_owned(),
        _ => USER_HOME.to_owned(),
    }
}

/// Decide access to `path`. Admin-only routes send signed-in non-admins to
/// their dashboard.
#[must_use]
pub fn guard(snapshot: &SessionSnapshot, path: &str, admin_only: bool) -> RouteDecision {
    if should_redirect_unauth(snapshot) {
        return RouteDecision::Redirect(login_redirect(path));
    }
    match &snapshot.user {
        None => RouteDecision::Wait,
        Some(user) if admin_only && !user.is_admin() => RouteDecision::Redirect(USER_HOME.to_owned()),
        Some(_) => RouteDecision::Allow,
    }
}
