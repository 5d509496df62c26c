//! Mock providers for testing.
//!
//! These mocks allow session logic to run at memory speed without a real
//! identity provider. Enabled by the default `test-utils` feature.

mod provider;

pub use provider::MockIdentityProvider;
