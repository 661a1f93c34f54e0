//! Client core for the spendbook expense tracker.
//!
//! Signs a user in through the Cognito hosted UI (OAuth2 authorization-code
//! flow with Google as the upstream provider), keeps the resulting session in
//! durable key/value storage, and wraps the budget, category and item REST
//! endpoints in small observable stores.
//!
//! ```rust,ignore
//! use spendbook::{Config, MemoryStorage, SessionManager};
//!
//! let config = Config::from_env()?;
//! let manager = SessionManager::new(config.auth_client(), MemoryStorage::default());
//! manager.restore_session();
//!
//! let login_url = manager.begin_login();
//! // ... the provider redirects back with `?code=...`
//! let next = manager.complete_login(&code).await?;
//! ```

pub mod api;
#[cfg(feature = "callback")]
pub mod callback;
pub mod config;
pub mod error;
pub mod guard;
pub mod id_token;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod stores;
pub mod summary;
pub mod types;

// Re-exports for convenient access
pub use api::ApiClient;
pub use config::Config;
pub use error::Error;
pub use guard::{GuardDecision, Route, RouteGuard};
pub use id_token::{IdTokenClaims, decode_unverified_claims};
pub use oauth::{AuthClient, OAuthConfig, TokenResponse};
pub use session::{AuthError, SessionManager, SessionReader, SessionSnapshot, SessionState};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use stores::{BudgetStore, CategoriesStore, ItemsStore, ResourceState};
pub use summary::{CategoryTotal, Summary};
pub use types::{Category, CategoryId, CustomerId, Item, ItemId, UserProfile};
