//! Identity resolution and change notification.
//!
//! The engine never decides who is signed in; it observes an
//! [`IdentityResolver`] owned by the application's auth layer. Changes are
//! delivered over a `tokio::sync::watch` channel, which gives every
//! synchronized collection its own receiver and fires exactly once per
//! actual transition (the handle dedups same-identity updates at the
//! sender).

use std::sync::Arc;

use tokio::sync::watch;

use eshop_core::{Identity, UserId};

/// Source of the current actor identity.
pub trait IdentityResolver: Send + Sync {
    /// The identity in effect right now.
    fn current(&self) -> Identity;

    /// A receiver that observes every subsequent identity transition.
    fn subscribe(&self) -> watch::Receiver<Identity>;
}

/// A cheaply cloneable identity source backed by a watch channel.
///
/// Supports the two-phase sign-in commit: `begin_login` claims an identity
/// optimistically (provisional - local scoping only, no remote sync) and
/// `confirm_login` commits it once the backend has confirmed.
#[derive(Clone)]
pub struct IdentityHandle {
    tx: Arc<watch::Sender<Identity>>,
}

impl IdentityHandle {
    /// Create a handle starting in the anonymous state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Identity::Anonymous);
        Self { tx: Arc::new(tx) }
    }

    /// Set the identity, notifying subscribers only on an actual change.
    pub fn set(&self, identity: Identity) {
        self.tx.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        });
    }

    /// Claim an identity optimistically while a sign-in is in flight.
    pub fn begin_login(&self, user: UserId) {
        self.set(Identity::Provisional(user));
    }

    /// Commit a server-confirmed identity.
    pub fn confirm_login(&self, user: UserId) {
        self.set(Identity::Authenticated(user));
    }

    /// Return to the anonymous state (sign-out or failed sign-in).
    pub fn logout(&self) {
        self.set(Identity::Anonymous);
    }
}

impl Default for IdentityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver for IdentityHandle {
    fn current(&self) -> Identity {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Identity> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fires_once_per_actual_transition() {
        let handle = IdentityHandle::new();
        let mut rx = handle.subscribe();

        handle.confirm_login(UserId::new("a"));
        // Setting the same identity again must not wake subscribers.
        handle.confirm_login(UserId::new("a"));

        assert!(rx.changed().await.is_ok());
        assert_eq!(
            *rx.borrow_and_update(),
            Identity::Authenticated(UserId::new("a"))
        );
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_two_phase_commit_transitions() {
        let handle = IdentityHandle::new();
        assert_eq!(handle.current(), Identity::Anonymous);

        handle.begin_login(UserId::new("u1"));
        assert_eq!(handle.current(), Identity::Provisional(UserId::new("u1")));
        assert!(handle.current().confirmed().is_none());

        handle.confirm_login(UserId::new("u1"));
        assert_eq!(
            handle.current(),
            Identity::Authenticated(UserId::new("u1"))
        );

        handle.logout();
        assert_eq!(handle.current(), Identity::Anonymous);
    }
}
