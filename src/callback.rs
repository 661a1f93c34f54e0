//! Axum routes that host the login flow.
//!
//! Serves the provider redirect target plus the small set of pages the guard
//! knows about, so a CLI or desktop shell can complete a login on loopback.
//!
//! ```rust,ignore
//! let manager = Arc::new(SessionManager::new(config.auth_client(), config.storage()));
//! manager.restore_session();
//!
//! let app = spendbook::callback::callback_routes(Arc::clone(&manager));
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::guard::{GuardDecision, Route};
use crate::session::{AuthError, SessionManager};
use crate::storage::KeyValueStore;

/// Shared state for the route handlers.
struct CallbackState<S> {
    manager: Arc<SessionManager<S>>,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for CallbackState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = match self {
            Self::InProgress => {
                return (StatusCode::CONFLICT, self.to_string()).into_response();
            }
            Self::TokenExchange(_) => "token_exchange_failed",
            Self::TokenParse(_) => "token_parse_failed",
            Self::Storage(_) => "session_failed",
        };
        login_error(code)
    }
}

/// Build the router.
///
/// The callback is mounted at the path of the configured redirect URI; when
/// that path is `/` the root route doubles as the callback.
pub fn callback_routes<S: KeyValueStore>(manager: Arc<SessionManager<S>>) -> Router {
    let callback_path = manager.config().redirect_uri().path().to_owned();
    let state = CallbackState { manager };

    let mut router = Router::new()
        .route(Route::Login.path(), get(login::<S>))
        .route(Route::Dashboard.path(), get(dashboard::<S>))
        .route("/logout", get(logout::<S>).post(logout::<S>));

    router = if callback_path == Route::Root.path() {
        router.route(Route::Root.path(), get(callback::<S>))
    } else {
        router
            .route(Route::Root.path(), get(root::<S>))
            .route(&callback_path, get(callback::<S>))
    };

    router.with_state(state)
}

// ── Guarded pages ──────────────────────────────────────────────────

fn redirect_to(route: Route) -> Response {
    Redirect::to(route.path()).into_response()
}

async fn root<S: KeyValueStore>(State(state): State<CallbackState<S>>) -> Response {
    match state.manager.route_guard().check(Route::Root) {
        GuardDecision::Redirect(target) => redirect_to(target),
        GuardDecision::Proceed => redirect_to(Route::Login),
    }
}

#[derive(Deserialize)]
struct LoginParams {
    error: Option<String>,
}

async fn login<S: KeyValueStore>(
    State(state): State<CallbackState<S>>,
    Query(params): Query<LoginParams>,
) -> Response {
    if let Some(error) = params.error {
        return (StatusCode::UNAUTHORIZED, format!("Login failed: {error}")).into_response();
    }
    match state.manager.route_guard().check(Route::Login) {
        GuardDecision::Redirect(target) => redirect_to(target),
        GuardDecision::Proceed => Redirect::to(state.manager.begin_login().as_str()).into_response(),
    }
}

async fn dashboard<S: KeyValueStore>(State(state): State<CallbackState<S>>) -> Response {
    match state.manager.route_guard().check(Route::Dashboard) {
        GuardDecision::Redirect(target) => redirect_to(target),
        GuardDecision::Proceed => Json(state.manager.snapshot().profile).into_response(),
    }
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<S: KeyValueStore>(
    State(state): State<CallbackState<S>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from identity provider");
        return login_error(desc);
    }

    let Some(code) = params.code else {
        return root(State(state)).await;
    };

    match state.manager.complete_login(&code).await {
        Ok(next) => redirect_to(next),
        Err(e) => e.into_response(),
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: KeyValueStore>(State(state): State<CallbackState<S>>) -> Response {
    redirect_to(state.manager.logout())
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{}?error={encoded}", Route::Login.path())).into_response()
}
