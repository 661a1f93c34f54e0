//! Navigation gating on the durable `isLoggedIn` flag.

use derive_more::Display;

use crate::storage::{KeyValueStore, keys};

/// Application destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Route {
    #[display("/")]
    Root,
    #[display("/login")]
    Login,
    #[display("/dashboard")]
    Dashboard,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Self::Root),
            "/login" => Some(Self::Login),
            "/dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    /// Whether anonymous users are kept out.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Dashboard)
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

/// Decide a navigation from the login flag alone.
#[must_use]
pub fn decide(to: Route, logged_in: bool) -> GuardDecision {
    match to {
        Route::Root if logged_in => GuardDecision::Redirect(Route::Dashboard),
        Route::Root => GuardDecision::Redirect(Route::Login),
        Route::Login if logged_in => GuardDecision::Redirect(Route::Dashboard),
        route if route.requires_auth() && !logged_in => GuardDecision::Redirect(Route::Login),
        _ => GuardDecision::Proceed,
    }
}

/// Checks navigations against the persisted login flag.
///
/// Reads storage on every check, so it follows logins and logouts made by any
/// manager sharing the same storage.
#[derive(Debug, Clone)]
pub struct RouteGuard<S> {
    storage: S,
}

impl<S: KeyValueStore> RouteGuard<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// `true` when the stored flag is exactly `"true"`. Unreadable storage counts as logged out.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        match self.storage.get(keys::IS_LOGGED_IN) {
            Ok(flag) => flag.as_deref() == Some(keys::LOGGED_IN_SENTINEL),
            Err(e) => {
                tracing::warn!(error = %e, "Reading login flag failed");
                false
            }
        }
    }

    #[must_use]
    pub fn check(&self, to: Route) -> GuardDecision {
        let decision = decide(to, self.is_logged_in());
        if let GuardDecision::Redirect(target) = decision {
            tracing::debug!(from = %to, to = %target, "Navigation redirected");
        }
        decision
    }
}
