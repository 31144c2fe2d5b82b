use crate::session::SessionSnapshot;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// What to do with a navigation to a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session still booting; show a placeholder and decide later.
    Loading,
    /// Signed out; go to login and come back to `from` afterwards.
    Redirect { to: &'static str, from: String },
    Allow,
}

pub fn guard(session: &SessionSnapshot, requested_path: &str) -> RouteDecision {
    if session.booting() {
        return RouteDecision::Loading;
    }

    if !session.is_authenticated() {
        return RouteDecision::Redirect {
            to: LOGIN_PATH,
            from: requested_path.to_string(),
        };
    }

    RouteDecision::Allow
}

/// Where to land after a successful login.
pub fn login_redirect_target(from: Option<&str>) -> &str {
    match from {
        Some(path) if !path.is_empty() && path != LOGIN_PATH => path,
        _ => HOME_PATH,
    }
}
