use serde::{Deserialize, Serialize};

pub const LOGIN_ROUTE_PATH: &str = "/";
pub const CHAT_ROUTE_PATH: &str = "/chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRoute {
    Login,
    Chat,
}

impl AppRoute {
    /// Unknown paths land on the login route; its guard forwards
    /// authenticated users to chat.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            CHAT_ROUTE_PATH => Self::Chat,
            _ => Self::Login,
        }
    }

    #[must_use]
    pub fn to_path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_ROUTE_PATH,
            Self::Chat => CHAT_ROUTE_PATH,
        }
    }

    #[must_use]
    pub fn guard(self) -> RouteGuard {
        match self {
            Self::Login => RouteGuard::PublicOnly,
            Self::Chat => RouteGuard::ProtectedOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Only for visitors without a session (the login screen).
    PublicOnly,
    /// Only for authenticated users (the conversation).
    ProtectedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    RenderChildren,
    /// Navigate elsewhere, replacing the current history entry so back
    /// navigation cannot return to the rejected route.
    Redirect { to: AppRoute, replace_history: bool },
}

impl RouteGuard {
    #[must_use]
    pub fn check(self, is_logged_in: bool) -> GuardOutcome {
        match (self, is_logged_in) {
            (Self::PublicOnly, true) => GuardOutcome::Redirect {
                to: AppRoute::Chat,
                replace_history: true,
            },
            (Self::ProtectedOnly, false) => GuardOutcome::Redirect {
                to: AppRoute::Login,
                replace_history: true,
            },
            (Self::PublicOnly, false) | (Self::ProtectedOnly, true) => GuardOutcome::RenderChildren,
        }
    }
}

/// Resolves a requested route into the route that should actually render,
/// following at most one guard redirect.
#[must_use]
pub fn resolve_route(requested: AppRoute, is_logged_in: bool) -> (AppRoute, bool) {
    match requested.guard().check(is_logged_in) {
        GuardOutcome::RenderChildren => (requested, false),
        GuardOutcome::Redirect {
            to,
            replace_history,
        } => (to, replace_history),
    }
}
