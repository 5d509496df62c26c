//! Error types for session operations.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failure modes surfaced by the controller.
///
/// Provider failures are deliberately not classified further: network
/// trouble, rejected credentials, and rate limits all come back as
/// [`SessionError::Provider`] with a display message. The message is for
/// UI display only, never for control flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The identity provider call failed for any reason.
    #[error("identity provider error: {message}")]
    Provider {
        /// Human-readable failure description from the provider.
        message: String,
    },

    /// A required credential field was empty, caught before the provider
    /// was contacted.
    #[error("missing credential: {field} must not be empty")]
    MissingCredential {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The configured provider timeout elapsed before the call resolved.
    #[error("identity provider timed out")]
    Timeout,
}

impl SessionError {
    /// Build a provider error from anything displayable.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure came from the provider side (as
    /// opposed to local validation).
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout)
    }
}
