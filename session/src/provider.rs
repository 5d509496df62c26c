//! Identity provider trait.
//!
//! The controller talks to exactly one external collaborator: the identity
//! provider owning credentials and tokens. Everything it needs is behind
//! this trait so tests can substitute an in-memory fake
//! ([`crate::mocks::MockIdentityProvider`]).

use crate::error::Result;
use crate::state::{AuthenticatedUser, Metadata};
use tokio::sync::mpsc;

/// Push notification from the provider that the session changed outside of
/// a direct call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    /// A session is (still) established — initial sign-in from another
    /// surface, or a token refresh re-asserting the current identity.
    SignedIn(AuthenticatedUser),

    /// The session ended remotely (logout elsewhere, token revocation).
    SignedOut,
}

/// Identity provider session API.
///
/// One long-lived handle per process, injected into the controller at
/// construction. The provider's own wire protocol is out of scope here;
/// implementations only have to honor these six operations.
pub trait IdentityProvider: Send + Sync {
    /// Fetch the currently established session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Provider`] if the provider cannot be
    /// reached or rejects the request.
    fn current_user(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<AuthenticatedUser>>> + Send;

    /// Authenticate with an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Provider`] on network failure or
    /// rejected credentials.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthenticatedUser>> + Send;

    /// Create an account and sign it in, attaching `metadata` to the new
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Provider`] on network failure or if
    /// the account cannot be created (e.g. email already registered).
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Metadata,
    ) -> impl std::future::Future<Output = Result<AuthenticatedUser>> + Send;

    /// Revoke the current session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Provider`] if revocation could not be
    /// confirmed remotely.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Trigger the out-of-band password reset flow for `email`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SessionError::Provider`] if the reset email could
    /// not be queued.
    fn send_password_reset(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Subscribe to push notifications for session changes.
    ///
    /// Dropping the receiver unsubscribes. The controller holds exactly one
    /// of these per instance, driven by its push-forwarding task.
    fn session_changes(&self) -> mpsc::Receiver<SessionChange>;
}
