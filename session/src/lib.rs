//! # Farehop Session
//!
//! Client-side session controller for the Farehop ticket resale
//! marketplace: a single authoritative [`Session`] value kept in sync with
//! a remote identity provider.
//!
//! ## Features
//!
//! - **One source of truth**: every UI surface reads the same `Session`
//! - **Two-way sync**: imperative operations up, provider push events down
//! - **Injectable provider**: the identity provider is a trait, so tests
//!   run against an in-memory mock at memory speed
//! - **No exceptions**: every failure is an explicit `Result` value
//!
//! ## Example
//!
//! ```rust
//! use farehop_session::{
//!     MockIdentityProvider, SessionConfig, SessionController, SessionStatus,
//! };
//!
//! # async fn example() -> farehop_session::Result<()> {
//! let provider = MockIdentityProvider::new().with_account("rider@example.com", "hunter2");
//! let mut controller = SessionController::new(provider, SessionConfig::default());
//!
//! controller.initialize().await?;
//! assert_eq!(controller.current().status(), SessionStatus::Unauthenticated);
//!
//! let user = controller.sign_in("rider@example.com", "hunter2").await?;
//! assert_eq!(user.email, "rider@example.com");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod controller;
pub mod error;
pub mod provider;
pub mod state;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use config::SessionConfig;
pub use controller::{SessionController, SessionWatcher};
pub use error::{Result, SessionError};
pub use provider::{IdentityProvider, SessionChange};
pub use state::{AuthenticatedUser, Metadata, Session, SessionStatus, UserId};

#[cfg(feature = "test-utils")]
pub use mocks::MockIdentityProvider;
