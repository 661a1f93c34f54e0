use crate::error::Error;

/// Failures of [`SessionManager::complete_login`](super::SessionManager::complete_login).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token endpoint unreachable or answered with a non-success status.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Token response or ID token payload could not be decoded.
    #[error("Token parse failed: {0}")]
    TokenParse(String),

    /// The session could not be written to durable storage.
    #[error("Session storage failed: {0}")]
    Storage(String),

    /// Another code exchange is still running.
    #[error("Login already in progress")]
    InProgress,
}

impl From<Error> for AuthError {
    fn from(e: Error) -> Self {
        match e {
            Error::TokenParse(detail) => Self::TokenParse(detail),
            Error::Storage(detail) => Self::Storage(detail),
            other => Self::TokenExchange(other.to_string()),
        }
    }
}
