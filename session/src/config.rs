//! Session controller configuration.
//!
//! Configuration values should be provided by the application, not
//! hardcoded.

use std::time::Duration;

/// Session controller configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Optional whole-operation timeout wrapped around every provider
    /// call. `None` waits indefinitely.
    ///
    /// Default: `None`
    pub provider_timeout: Option<Duration>,

    /// Capacity of the change-notification channel handed to subscribers.
    /// A subscriber that falls further behind than this skips ahead to the
    /// newest value.
    ///
    /// Default: 16
    pub change_buffer: usize,
}

impl SessionConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            provider_timeout: None,
            change_buffer: 16,
        }
    }

    /// Set a timeout for provider calls.
    #[must_use]
    pub const fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    /// Set the subscriber channel capacity.
    #[must_use]
    pub const fn with_change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
