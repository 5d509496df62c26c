//! Session state types.
//!
//! This module defines the authentication state tracked by the controller.
//! All types are `Clone` so snapshots can be handed to subscribers freely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user, assigned by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// Opaque metadata attached to an identity at sign-up.
///
/// The controller never inspects this map; it is carried verbatim from
/// `sign_up` to the provider and back on the identity record.
pub type Metadata = Map<String, Value>;

/// Identity record for an authenticated user.
///
/// Cached from the identity provider; the provider owns credentials and
/// tokens, this is only the slice the UI needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Provider-assigned user identifier.
    pub id: UserId,

    /// Email address the account was registered with.
    pub email: String,

    /// Opaque key-value metadata attached at sign-up.
    #[serde(default)]
    pub metadata: Metadata,
}

impl AuthenticatedUser {
    /// Create an identity record with no metadata.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach sign-up metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// Resolution state of the session.
///
/// Starts at `Unknown`, transitions exactly once to `Authenticated` or
/// `Unauthenticated` when the initial provider fetch resolves, then flips
/// freely between the two on sign-in/out and push events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Initial fetch has not resolved yet.
    Unknown,
    /// A user is signed in.
    Authenticated,
    /// No user is signed in.
    Unauthenticated,
}

/// The authentication state tracked by the controller.
///
/// Fields are private so the `status == Authenticated ⟺ user present`
/// invariant holds by construction; every state change replaces the whole
/// value, there is no partial mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    status: SessionStatus,
    user: Option<AuthenticatedUser>,
    last_error: Option<String>,
}

impl Session {
    /// The unresolved session a controller starts with.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            status: SessionStatus::Unknown,
            user: None,
            last_error: None,
        }
    }

    /// Session for a signed-in user. Clears any previous error.
    #[must_use]
    pub const fn authenticated(user: AuthenticatedUser) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: Some(user),
            last_error: None,
        }
    }

    /// Session with nobody signed in, optionally recording why the last
    /// operation failed.
    #[must_use]
    pub const fn unauthenticated(last_error: Option<String>) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
            last_error,
        }
    }

    /// Same `status`/`user`, different `last_error`.
    ///
    /// Used when a failed operation must leave the authentication state
    /// untouched but still surface the failure to the UI.
    #[must_use]
    pub fn with_last_error(&self, message: impl Into<String>) -> Self {
        Self {
            status: self.status,
            user: self.user.clone(),
            last_error: Some(message.into()),
        }
    }

    /// Resolution state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// The signed-in identity, present iff `status` is `Authenticated`.
    #[must_use]
    pub const fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    /// Human-readable description of the last failed operation, for UI
    /// display only.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `true` once the initial fetch has resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self.status, SessionStatus::Unknown)
    }

    /// `true` if a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unknown()
    }
}
