//! Session state shared by the repository, the sync mediator and the HTTP client.
//!
//! A [`Session`] is a cheap, cloneable handle. Every clone observes the same
//! state, so signing in through one handle is immediately visible to the
//! components that were constructed with another.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::AuthState;

/// Explicitly constructed authentication holder.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<Option<AuthState>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    /// Create a session, optionally already signed in.
    pub fn new(initial: Option<AuthState>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
        }
    }

    /// An anonymous session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Store credentials returned by sign-in or sign-up.
    pub fn set_auth(&self, auth: AuthState) {
        log::info!("[Session] Signed in as user {}", auth.id);
        self.state.send_replace(Some(auth));
    }

    /// Forget the current credentials.
    pub fn remove_auth(&self) {
        log::info!("[Session] Signed out");
        self.state.send_replace(None);
    }

    /// Current credentials, if signed in.
    pub fn current(&self) -> Option<AuthState> {
        self.state.borrow().clone()
    }

    /// Id of the signed-in user.
    pub fn user_id(&self) -> Option<i64> {
        self.state.borrow().as_ref().map(|a| a.id)
    }

    /// Token for the `Authorization` header.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|a| a.token.clone())
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Observe sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthState>> {
        self.state.subscribe()
    }
}
