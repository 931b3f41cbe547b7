//! Account identity and the observer that drives cart reloads.
//!
//! The cart engine never issues or refreshes credentials itself; the
//! authentication collaborator owns the token lifecycle and publishes
//! identity changes through a `tokio::sync::watch` channel. The
//! [`IdentityObserver`] consumes that channel and swaps the cart store onto
//! the backend matching the new identity.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;
use trolley_core::UserId;

use crate::store::CartStore;

/// The identity that currently owns the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    /// A device-local session with no account. The cart lives in the
    /// device store.
    #[default]
    Anonymous,
    /// A signed-in account. The cart lives on the remote cart service.
    Authenticated(UserId),
}

impl Identity {
    /// Whether this identity maps to the remote backend.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The account id, if authenticated.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user_id) => Some(*user_id),
        }
    }
}

/// Shared handle to the ambient bearer credential.
///
/// Owned and written by the authentication collaborator; the remote backend
/// reads it on every call. Cheaply cloneable.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<SecretString>>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    /// Replace the current bearer token.
    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(SecretString::from(token.into()));
        }
    }

    /// Drop the current bearer token (logout).
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }

    /// The current bearer token, if one is set.
    #[must_use]
    pub fn bearer(&self) -> Option<SecretString> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.inner.read() {
            Ok(guard) if guard.is_some() => "[REDACTED]",
            Ok(_) => "(none)",
            Err(_) => "(poisoned)",
        };
        f.debug_struct("CredentialStore").field("token", &state).finish()
    }
}

/// Watches the current account identity and reloads the cart on any change.
///
/// Two states: [`Identity::Anonymous`] and [`Identity::Authenticated`].
/// Every observed transition discards the in-memory snapshot, selects the
/// matching backend and triggers a full `load()`. Anonymous cart contents
/// are NOT carried over into a newly authenticated cart.
pub struct IdentityObserver {
    identity_rx: watch::Receiver<Identity>,
    store: CartStore,
}

impl IdentityObserver {
    #[must_use]
    pub const fn new(identity_rx: watch::Receiver<Identity>, store: CartStore) -> Self {
        Self { identity_rx, store }
    }

    /// Consume identity changes until the sending side is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        while self.identity_rx.changed().await.is_ok() {
            let identity = *self.identity_rx.borrow_and_update();
            tracing::debug!(?identity, "identity changed, reloading cart");
            self.store.set_identity(identity).await;
        }
        tracing::debug!("identity channel closed, observer stopping");
    }

    /// Spawn the observer onto the current runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accessors() {
        assert!(!Identity::Anonymous.is_authenticated());
        assert_eq!(Identity::Anonymous.user_id(), None);

        let identity = Identity::Authenticated(UserId::new(42));
        assert!(identity.is_authenticated());
        assert_eq!(identity.user_id(), Some(UserId::new(42)));
    }

    #[test]
    fn test_credential_store_set_and_clear() {
        let store = CredentialStore::new();
        assert!(store.bearer().is_none());

        store.set("token-abc");
        assert!(store.bearer().is_some());

        store.clear();
        assert!(store.bearer().is_none());
    }

    #[test]
    fn test_credential_store_debug_redacts() {
        let store = CredentialStore::with_token("super-secret-token");
        let debug_output = format!("{store:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-token"));
    }
}
