use tokio::sync::watch;

use crate::types::UserProfile;

/// Coarse session state derived from a [`SessionSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    /// A code exchange is in flight.
    Authenticating,
    LoggedIn,
}

/// Current session fields.
///
/// `access_token` and `id_token` are always both present or both absent, and
/// `profile` is present exactly when they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub profile: Option<UserProfile>,
    /// True only while `complete_login` is running.
    pub is_loading: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.is_loading {
            SessionState::Authenticating
        } else if self.is_authenticated() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }
}

/// Write side of the session. Owned by the manager.
#[derive(Debug)]
pub(super) struct TokenStore {
    tx: watch::Sender<SessionSnapshot>,
}

impl TokenStore {
    pub(super) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx }
    }

    pub(super) fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
        }
    }

    pub(super) fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    /// Raise the loading flag. Returns `false` if it was already raised.
    pub(super) fn try_begin_exchange(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.is_loading {
                false
            } else {
                s.is_loading = true;
                true
            }
        })
    }

    pub(super) fn end_exchange(&self) {
        self.tx.send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
    }

    /// Install a full session and drop the loading flag in one update.
    pub(super) fn publish(&self, access_token: String, id_token: String, profile: UserProfile) {
        self.tx.send_modify(|s| {
            s.access_token = Some(access_token);
            s.id_token = Some(id_token);
            s.profile = Some(profile);
            s.is_loading = false;
        });
    }

    pub(super) fn clear(&self) {
        self.tx.send_modify(|s| {
            s.access_token = None;
            s.id_token = None;
            s.profile = None;
        });
    }
}

/// Read-only, cloneable view of the session.
#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionReader {
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.rx.borrow().state()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.rx.borrow().profile.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.rx.borrow().access_token.clone()
    }

    /// Wait for the next change.
    ///
    /// # Errors
    ///
    /// Fails once the owning manager has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// Wait until `predicate` holds for the current snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the manager is dropped before the predicate holds.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, watch::error::RecvError> {
        let snapshot = self.rx.wait_for(|s| predicate(s)).await?;
        Ok(snapshot.clone())
    }
}
