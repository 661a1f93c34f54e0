//! OAuth2 session lifecycle.
//!
//! [`SessionManager`] is the only writer of session state. Everything else
//! reads through a [`SessionReader`], which can be cloned freely and awaited
//! for changes.
//!
//! ```rust,ignore
//! let manager = SessionManager::new(client, FileStorage::new("session.json"));
//! manager.restore_session();
//!
//! let reader = manager.reader();
//! tokio::spawn(async move {
//!     let mut reader = reader;
//!     while reader.changed().await.is_ok() {
//!         println!("session is now {:?}", reader.state());
//!     }
//! });
//! ```

mod error;
mod manager;
mod state;

pub use error::AuthError;
pub use manager::SessionManager;
pub use state::{SessionReader, SessionSnapshot, SessionState};
