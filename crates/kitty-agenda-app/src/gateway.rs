//! Session gateway: who is signed in, and notifications when that changes.

use kitty_agenda_core::UserId;
use thiserror::Error;
use tokio::sync::watch;

/// Signed-in user as seen by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Owner of every task the shell loads.
    pub user_id: UserId,
    /// Sign-in email (may be empty when the provider hides it).
    pub email: String,
}

/// Authentication failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials refused; the message is shown to the user as-is.
    #[error("{0}")]
    Rejected(String),
    /// The auth service could not be reached.
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// Authentication contract used by the interaction service.
#[allow(async_fn_in_trait)]
pub trait SessionGateway {
    /// Session active right now, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Register for future session changes.
    fn subscribe(&self) -> SessionSubscription;

    /// Start a session with email and password.
    ///
    /// # Errors
    /// Returns [`AuthError::Rejected`] for bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Create an account. A session starts only when no confirmation is pending.
    ///
    /// # Errors
    /// Returns [`AuthError::Rejected`] for duplicate accounts or weak passwords.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// End the current session. Failures are logged, never surfaced.
    async fn sign_out(&self);
}

/// Publishing side of session changes, owned by a gateway implementation.
#[derive(Debug)]
pub struct SessionBroadcaster {
    tx: watch::Sender<Option<Session>>,
}

impl SessionBroadcaster {
    /// Start with no session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Latest published session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Publish a session change to every live subscription.
    pub fn publish(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    /// Subscribe to changes published after this call.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SessionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle yielding session changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    /// Wait for the next change. Returns `None` once the gateway is gone.
    ///
    /// Changes published in quick succession collapse into the latest one.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Release the subscription explicitly.
    pub fn unsubscribe(self) {}
}
