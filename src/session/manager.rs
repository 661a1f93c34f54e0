use std::sync::Arc;

use url::Url;

use super::error::AuthError;
use super::state::{SessionReader, SessionSnapshot, SessionState, TokenStore};
use crate::error::Error;
use crate::guard::{Route, RouteGuard};
use crate::id_token::decode_unverified_claims;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::storage::{KeyValueStore, keys};
use crate::types::UserProfile;

/// Drives the authorization-code flow and owns the session.
///
/// Navigation is returned rather than performed: [`begin_login`](Self::begin_login)
/// yields the provider URL, and the other operations yield the [`Route`] to go to
/// next. The host (callback server, CLI) acts on it.
pub struct SessionManager<S> {
    client: AuthClient,
    storage: Arc<S>,
    store: TokenStore,
}

/// Persisted session fields, read back at startup.
struct Persisted {
    access_token: String,
    id_token: String,
    profile: UserProfile,
}

/// Drops the loading flag if `complete_login` is abandoned mid-exchange.
struct ExchangeGuard<'a> {
    store: &'a TokenStore,
    armed: bool,
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.end_exchange();
        }
    }
}

impl<S: KeyValueStore> SessionManager<S> {
    /// Create a manager with an empty (logged-out) in-memory session.
    ///
    /// Call [`restore_session`](Self::restore_session) once to pick up a
    /// previously persisted session.
    #[must_use]
    pub fn new(client: AuthClient, storage: S) -> Self {
        Self {
            client,
            storage: Arc::new(storage),
            store: TokenStore::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        self.client.config()
    }

    #[must_use]
    pub fn reader(&self) -> SessionReader {
        self.store.reader()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.store.snapshot().state()
    }

    /// Guard over the same durable storage this manager writes.
    #[must_use]
    pub fn route_guard(&self) -> RouteGuard<Arc<S>> {
        RouteGuard::new(Arc::clone(&self.storage))
    }

    /// Authorization URL to send the user to.
    #[must_use]
    pub fn begin_login(&self) -> Url {
        let url = self.client.authorization_url();
        tracing::debug!(provider = %self.client.config().identity_provider(), "Starting login redirect");
        url
    }

    /// Provider logout URL.
    ///
    /// [`logout`](Self::logout) only clears local state; it does not send the
    /// user here.
    #[must_use]
    pub fn logout_url(&self) -> Url {
        self.client.logout_url()
    }

    /// Exchange an authorization code and establish the session.
    ///
    /// The profile is derived before anything is written, and tokens, profile
    /// and flags go to storage in a single `set_many`. A failure at any step
    /// leaves both storage and the in-memory session as they were.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InProgress`] if another exchange is running
    /// - [`AuthError::TokenExchange`] if the token endpoint fails
    /// - [`AuthError::TokenParse`] if the response or ID token payload is malformed
    /// - [`AuthError::Storage`] if the session cannot be persisted
    pub async fn complete_login(&self, code: &str) -> Result<Route, AuthError> {
        if !self.store.try_begin_exchange() {
            tracing::warn!("Ignoring authorization code: exchange already in flight");
            return Err(AuthError::InProgress);
        }
        let mut guard = ExchangeGuard {
            store: &self.store,
            armed: true,
        };

        let persisted = self.exchange_and_persist(code).await.inspect_err(|e| {
            tracing::error!(error = %e, "Login failed");
        })?;

        guard.armed = false;
        tracing::info!(email = %persisted.profile.email, "Login successful");
        self.store
            .publish(persisted.access_token, persisted.id_token, persisted.profile);

        Ok(Route::Dashboard)
    }

    async fn exchange_and_persist(&self, code: &str) -> Result<Persisted, AuthError> {
        let tokens = self.client.exchange_code(code).await?;

        let profile = decode_unverified_claims(&tokens.id_token)?.to_profile();
        let user_info = serde_json::to_string(&profile)
            .map_err(|e| AuthError::Storage(format!("serialize profile: {e}")))?;

        self.storage.set_many(&[
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::ID_TOKEN, tokens.id_token.as_str()),
            (keys::USER_INFO, user_info.as_str()),
            (keys::IS_LOGGED_IN, keys::LOGGED_IN_SENTINEL),
            (keys::USER_EMAIL, profile.email.as_str()),
        ])?;

        Ok(Persisted {
            access_token: tokens.access_token,
            id_token: tokens.id_token,
            profile,
        })
    }

    /// Clear the session locally and return the login route.
    ///
    /// Never fails; a storage error is logged and the in-memory session is
    /// cleared regardless. Calling it while logged out is a no-op.
    pub fn logout(&self) -> Route {
        if let Err(e) = self.storage.remove_many(&keys::ALL) {
            tracing::warn!(error = %e, "Clearing persisted session failed during logout");
        }
        self.store.clear();
        tracing::info!("Logged out");
        Route::Login
    }

    /// Load a previously persisted session into memory.
    ///
    /// A corrupt profile blob or a partial token set is discarded: every
    /// session key is removed and the session starts logged out.
    pub fn restore_session(&self) -> SessionState {
        match self.load_persisted() {
            Ok(Some(persisted)) => {
                tracing::debug!(email = %persisted.profile.email, "Restored persisted session");
                self.store
                    .publish(persisted.access_token, persisted.id_token, persisted.profile);
            }
            Ok(None) => self.store.clear(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(e) = self.storage.remove_many(&keys::ALL) {
                    tracing::warn!(error = %e, "Clearing unreadable session failed");
                }
                self.store.clear();
            }
        }
        self.state()
    }

    fn load_persisted(&self) -> Result<Option<Persisted>, Error> {
        let access_token = self.storage.get(keys::ACCESS_TOKEN)?;
        let id_token = self.storage.get(keys::ID_TOKEN)?;
        let user_info = self.storage.get(keys::USER_INFO)?;

        match (access_token, id_token, user_info) {
            (None, None, None) => {
                if self.storage.get(keys::IS_LOGGED_IN)?.is_some()
                    || self.storage.get(keys::USER_EMAIL)?.is_some()
                {
                    return Err(Error::Storage("login flag without persisted tokens".into()));
                }
                Ok(None)
            }
            (Some(access_token), Some(id_token), Some(user_info)) => {
                let profile = serde_json::from_str(&user_info)
                    .map_err(|e| Error::Storage(format!("{}: {e}", keys::USER_INFO)))?;
                Ok(Some(Persisted {
                    access_token,
                    id_token,
                    profile,
                }))
            }
            _ => Err(Error::Storage("incomplete persisted session".into())),
        }
    }
}
