//! Mock identity provider for testing.

use crate::error::{Result, SessionError};
use crate::provider::{IdentityProvider, SessionChange};
use crate::state::{AuthenticatedUser, Metadata, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: AuthenticatedUser,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    current: Option<AuthenticatedUser>,
    fail_next: Option<String>,
    latency: Option<Duration>,
    reset_requests: Vec<String>,
    push_senders: Vec<mpsc::Sender<SessionChange>>,
}

/// Mock identity provider.
///
/// In-memory accounts, scripted failures, optional latency, and a
/// test-side push handle feeding `session_changes()` subscribers.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockIdentityProvider {
    /// Create an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account (builder form).
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.register(email, password);
        self
    }

    /// Add a delay to every provider call (builder form).
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Seed an account and return its identity record.
    pub fn register(&self, email: &str, password: &str) -> AuthenticatedUser {
        let user = AuthenticatedUser::new(UserId::new(), email);
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Mark a user as already signed in, as if a session existed before
    /// the controller was constructed.
    pub fn set_current(&self, user: Option<AuthenticatedUser>) {
        self.lock().current = user;
    }

    /// Script the next provider call to fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    /// Emails that password resets were requested for, in order.
    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        self.lock().reset_requests.clone()
    }

    /// The identity the provider currently considers signed in.
    #[must_use]
    pub fn current(&self) -> Option<AuthenticatedUser> {
        self.lock().current.clone()
    }

    /// Number of live push subscriptions (for asserting the controller
    /// registers exactly one).
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let mut inner = self.lock();
        inner.push_senders.retain(|tx| !tx.is_closed());
        inner.push_senders.len()
    }

    /// Deliver a push notification to every subscriber and update the
    /// provider-side session accordingly.
    pub async fn push(&self, change: SessionChange) {
        let senders = {
            let mut inner = self.lock();
            inner.current = match &change {
                SessionChange::SignedIn(user) => Some(user.clone()),
                SessionChange::SignedOut => None,
            };
            inner.push_senders.retain(|tx| !tx.is_closed());
            inner.push_senders.clone()
        };
        for tx in senders {
            let _ = tx.send(change.clone()).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume a scripted failure and simulate latency, shared prologue of
    /// every provider call.
    async fn prologue(inner: &Arc<Mutex<Inner>>) -> Result<()> {
        let (latency, failure) = {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            (guard.latency, guard.fail_next.take())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(message) => Err(SessionError::provider(message)),
            None => Ok(()),
        }
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn current_user(
        &self,
    ) -> impl Future<Output = Result<Option<AuthenticatedUser>>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::prologue(&inner).await?;
            Ok(inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current
                .clone())
        }
    }

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthenticatedUser>> + Send {
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();
        let password = password.to_string();

        async move {
            Self::prologue(&inner).await?;
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);

            let user = match guard.accounts.get(&email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(SessionError::provider("invalid credentials")),
            };

            guard.current = Some(user.clone());
            Ok(user)
        }
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Metadata,
    ) -> impl Future<Output = Result<AuthenticatedUser>> + Send {
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();
        let password = password.to_string();

        async move {
            Self::prologue(&inner).await?;
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);

            if guard.accounts.contains_key(&email) {
                return Err(SessionError::provider("email already registered"));
            }

            let user = AuthenticatedUser::new(UserId::new(), &email).with_metadata(metadata);
            guard.accounts.insert(
                email,
                Account {
                    password,
                    user: user.clone(),
                },
            );
            guard.current = Some(user.clone());
            Ok(user)
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);

        async move {
            Self::prologue(&inner).await?;
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current = None;
            Ok(())
        }
    }

    fn send_password_reset(&self, email: &str) -> impl Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();

        async move {
            Self::prologue(&inner).await?;
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .reset_requests
                .push(email);
            Ok(())
        }
    }

    fn session_changes(&self) -> mpsc::Receiver<SessionChange> {
        let (tx, rx) = mpsc::channel(16);
        self.lock().push_senders.push(tx);
        rx
    }
}
