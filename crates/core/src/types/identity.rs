//! The current actor context that scopes persistence.
//!
//! Identity is owned by whatever authentication layer the application uses;
//! the synchronization engine only observes it. The `Provisional` state is
//! the first half of a two-phase commit: an identity claimed optimistically
//! (e.g. from a cached profile while a sign-in request is in flight) that
//! has not yet been confirmed by the backend. Provisional identities scope
//! local storage like authenticated ones but never sync remotely, so a
//! write can never land under a user id the server later rejects.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The current actor: anonymous, optimistically signed-in, or confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    /// No user is signed in.
    Anonymous,
    /// A sign-in is in flight; the id is claimed but not server-confirmed.
    Provisional(UserId),
    /// A server-confirmed authenticated user.
    Authenticated(UserId),
}

impl Identity {
    /// The user id scoping local storage, if any.
    ///
    /// Both provisional and authenticated identities scope local keys, so
    /// items added during a pending sign-in survive the confirmation.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Provisional(id) | Self::Authenticated(id) => Some(id),
        }
    }

    /// The user id if (and only if) the identity is server-confirmed.
    ///
    /// Remote reads and writes key off this: a provisional identity must
    /// never produce backend traffic.
    #[must_use]
    pub const fn confirmed(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(id) => Some(id),
            Self::Anonymous | Self::Provisional(_) => None,
        }
    }

    /// Whether no user is signed in.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The storage key for a collection namespace under this identity.
    ///
    /// Anonymous state lives under the bare namespace; signed-in state is
    /// suffixed with the user id so carts never bleed across accounts on a
    /// shared device.
    #[must_use]
    pub fn storage_key(&self, namespace: &str) -> String {
        match self.user_id() {
            Some(id) => format!("{namespace}_{id}"),
            None => namespace.to_owned(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Provisional(id) => write!(f, "provisional({id})"),
            Self::Authenticated(id) => write!(f, "authenticated({id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_scoping() {
        assert_eq!(Identity::Anonymous.storage_key("eshop_cart"), "eshop_cart");
        assert_eq!(
            Identity::Authenticated(UserId::new("user-42")).storage_key("eshop_cart"),
            "eshop_cart_user-42"
        );
        // Provisional scopes the same key the confirmed identity will use.
        assert_eq!(
            Identity::Provisional(UserId::new("user-42")).storage_key("eshop_cart"),
            "eshop_cart_user-42"
        );
    }

    #[test]
    fn test_confirmed_excludes_provisional() {
        let id = UserId::new("u");
        assert_eq!(
            Identity::Authenticated(id.clone()).confirmed(),
            Some(&id)
        );
        assert_eq!(Identity::Provisional(id.clone()).confirmed(), None);
        assert_eq!(Identity::Provisional(id.clone()).user_id(), Some(&id));
        assert_eq!(Identity::Anonymous.user_id(), None);
    }
}
