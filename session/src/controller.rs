//! Session controller.
//!
//! [`SessionController`] owns the single authoritative [`Session`] value
//! for a UI process and keeps it synchronized with the identity provider,
//! in both directions: imperative calls (`sign_in`, `sign_out`, ...) flow
//! up, push notifications (token refresh, remote logout) flow down through
//! a forwarding task.
//!
//! # State machine
//!
//! ```text
//! Unknown ──initialize()──▶ Authenticated ◀──sign_in/push──▶ Unauthenticated
//! ```
//!
//! `Unknown` is left exactly once; afterwards the two resolved states flip
//! freely. Every transition replaces the whole `Session` value under one
//! lock acquisition, so observers never see a torn update.
//!
//! # Concurrency
//!
//! Overlapping operations are not serialized: last writer wins. The busy
//! counter covers all in-flight operations so the UI can disable forms
//! while any call is pending.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::provider::{IdentityProvider, SessionChange};
use crate::state::{AuthenticatedUser, Metadata, Session};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// State shared between the controller, its push-forwarding task, and the
/// busy guards of in-flight operations.
struct Shared {
    session: Mutex<Session>,
    changes: broadcast::Sender<Session>,
    in_flight: AtomicUsize,
}

impl Shared {
    /// Read, replace, and notify under a single lock acquisition.
    ///
    /// The closure sees the stored value at replacement time, so a push
    /// event that landed while an operation was in flight is never
    /// overwritten with a stale snapshot. The broadcast happens while the
    /// lock is held so subscribers observe transitions in the same order
    /// they are stored.
    fn update(&self, f: impl FnOnce(&Session) -> Session) -> Session {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = f(&guard);
        *guard = next.clone();
        // Send failure just means nobody is subscribed right now.
        let _ = self.changes.send(next.clone());
        drop(guard);
        next
    }

    /// Replace the session unconditionally and notify subscribers.
    fn replace(&self, next: Session) -> Session {
        self.update(move |_| next)
    }

    fn snapshot(&self) -> Session {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Decrements the in-flight counter when an operation resolves, on every
/// exit path.
struct BusyGuard<'a>(&'a AtomicUsize);

impl<'a> BusyGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Subscription handle returned by [`SessionController::subscribe`].
///
/// Receives one [`Session`] per change, in order. Dropping the watcher
/// deregisters it.
pub struct SessionWatcher {
    rx: broadcast::Receiver<Session>,
}

impl SessionWatcher {
    /// Wait for the next session change.
    ///
    /// Returns `None` once the controller (and every clone of its change
    /// channel) is gone. A watcher that fell behind the channel capacity
    /// skips the missed values and resumes with the oldest retained one.
    pub async fn next(&mut self) -> Option<Session> {
        loop {
            match self.rx.recv().await {
                Ok(session) => return Some(session),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session watcher lagged behind, skipping ahead");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Maintains the authoritative [`Session`] for one UI process.
///
/// One instance per process, constructed with a long-lived provider handle
/// (dependency injection; tests substitute
/// [`crate::mocks::MockIdentityProvider`]).
pub struct SessionController<P: IdentityProvider> {
    provider: P,
    config: SessionConfig,
    shared: Arc<Shared>,
    push_task: Option<JoinHandle<()>>,
}

impl<P: IdentityProvider> SessionController<P> {
    /// Create a controller. The session starts `Unknown`; call
    /// [`initialize`](Self::initialize) to resolve it.
    #[must_use]
    pub fn new(provider: P, config: SessionConfig) -> Self {
        let (changes, _) = broadcast::channel(config.change_buffer.max(1));
        Self {
            provider,
            config,
            shared: Arc::new(Shared {
                session: Mutex::new(Session::unknown()),
                changes,
                in_flight: AtomicUsize::new(0),
            }),
            push_task: None,
        }
    }

    /// Resolve the session from the provider and start listening for push
    /// notifications.
    ///
    /// Idempotent: calling again re-fetches and overwrites the session but
    /// never registers a second push subscription. After this resolves the
    /// session is never `Unknown` again.
    ///
    /// # Errors
    ///
    /// Returns the provider failure. The session is still resolved to
    /// `Unauthenticated` with `last_error` recorded.
    pub async fn initialize(&mut self) -> Result<Session> {
        if self.push_task.is_none() {
            let rx = self.provider.session_changes();
            let shared = Arc::clone(&self.shared);
            self.push_task = Some(tokio::spawn(forward_pushes(rx, shared)));
        }

        let _busy = BusyGuard::enter(&self.shared.in_flight);
        match self.call(self.provider.current_user()).await {
            Ok(Some(user)) => {
                debug!(email = %user.email, "session resolved: authenticated");
                Ok(self.shared.replace(Session::authenticated(user)))
            },
            Ok(None) => {
                debug!("session resolved: unauthenticated");
                Ok(self.shared.replace(Session::unauthenticated(None)))
            },
            Err(error) => {
                warn!(%error, "session resolution failed");
                self.shared
                    .replace(Session::unauthenticated(Some(error.to_string())));
                Err(error)
            },
        }
    }

    /// Authenticate with an email/password pair.
    ///
    /// On success the session becomes `Authenticated` for the returned
    /// identity. On failure `user` and `status` are left exactly as they
    /// were and `last_error` records the failure.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingCredential`] if either field is empty (the
    /// provider is not contacted), otherwise the provider failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthenticatedUser> {
        let _busy = BusyGuard::enter(&self.shared.in_flight);
        require_non_empty(email, "email")
            .and_then(|()| require_non_empty(password, "password"))
            .inspect_err(|error| self.record_failure(error))?;

        match self
            .call(self.provider.sign_in_with_password(email, password))
            .await
        {
            Ok(user) => {
                debug!(email = %user.email, "sign-in succeeded");
                self.shared.replace(Session::authenticated(user.clone()));
                Ok(user)
            },
            Err(error) => {
                warn!(%error, "sign-in failed");
                self.record_failure(&error);
                Err(error)
            },
        }
    }

    /// Create an account and sign it in, attaching `metadata` to the new
    /// identity.
    ///
    /// Same contract as [`sign_in`](Self::sign_in).
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingCredential`] if either credential is empty,
    /// otherwise the provider failure.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Metadata,
    ) -> Result<AuthenticatedUser> {
        let _busy = BusyGuard::enter(&self.shared.in_flight);
        require_non_empty(email, "email")
            .and_then(|()| require_non_empty(password, "password"))
            .inspect_err(|error| self.record_failure(error))?;

        match self
            .call(self.provider.sign_up(email, password, metadata))
            .await
        {
            Ok(user) => {
                debug!(email = %user.email, "sign-up succeeded");
                self.shared.replace(Session::authenticated(user.clone()));
                Ok(user)
            },
            Err(error) => {
                warn!(%error, "sign-up failed");
                self.record_failure(&error);
                Err(error)
            },
        }
    }

    /// Sign out.
    ///
    /// The local session is cleared to `Unauthenticated` unconditionally,
    /// even when remote revocation fails: a stale local session is the
    /// worse failure mode for a client. The provider failure is still
    /// returned and recorded in `last_error`.
    ///
    /// # Errors
    ///
    /// Returns the provider failure if remote revocation could not be
    /// confirmed.
    pub async fn sign_out(&self) -> Result<()> {
        let _busy = BusyGuard::enter(&self.shared.in_flight);
        let result = self.call(self.provider.sign_out()).await;
        match &result {
            Ok(()) => {
                debug!("signed out");
                self.shared.replace(Session::unauthenticated(None));
            },
            Err(error) => {
                warn!(%error, "remote sign-out failed, clearing local session anyway");
                self.shared
                    .replace(Session::unauthenticated(Some(error.to_string())));
            },
        }
        result
    }

    /// Trigger the out-of-band password reset flow for `email`.
    ///
    /// Never alters the session, success or failure.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingCredential`] if `email` is empty, otherwise
    /// the provider failure.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let _busy = BusyGuard::enter(&self.shared.in_flight);
        require_non_empty(email, "email")?;

        self.call(self.provider.send_password_reset(email))
            .await
            .inspect(|()| debug!(%email, "password reset requested"))
            .inspect_err(|error| warn!(%error, "password reset request failed"))
    }

    /// Subscribe to session changes.
    ///
    /// The watcher receives every subsequent [`Session`] value, one per
    /// change, as long as it keeps up; one that falls more than
    /// [`SessionConfig::change_buffer`] events behind skips ahead to the
    /// oldest retained value. Dropping it deregisters.
    #[must_use]
    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.shared.changes.subscribe(),
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Session {
        self.shared.snapshot()
    }

    /// `true` while any operation is in flight. Transient UI metadata, not
    /// part of [`Session`].
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Cancel the push subscription. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.push_task.take() {
            debug!("cancelling provider push subscription");
            task.abort();
        }
    }

    /// Keep `status`/`user`, record the failure for UI display.
    ///
    /// Applied on the value stored at replacement time, so a push event
    /// that resolved the session while this operation was in flight wins.
    fn record_failure(&self, error: &SessionError) {
        let message = error.to_string();
        self.shared.update(move |current| current.with_last_error(message));
    }

    /// Run a provider call under the configured timeout, if any.
    async fn call<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match self.config.provider_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| SessionError::Timeout)?,
            None => fut.await,
        }
    }
}

impl<P: IdentityProvider> Drop for SessionController<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forward provider push notifications into the shared session.
///
/// Runs until the provider closes the channel or the controller aborts the
/// task on shutdown. A push event fully replaces the session, same as a
/// local operation.
async fn forward_pushes(mut rx: mpsc::Receiver<SessionChange>, shared: Arc<Shared>) {
    while let Some(change) = rx.recv().await {
        let next = match change {
            SessionChange::SignedIn(user) => {
                debug!(email = %user.email, "provider push: signed in");
                Session::authenticated(user)
            },
            SessionChange::SignedOut => {
                debug!("provider push: signed out");
                Session::unauthenticated(None)
            },
        };
        shared.replace(next);
    }
    debug!("provider push channel closed");
}

fn require_non_empty(value: &str, field: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(SessionError::MissingCredential { field });
    }
    Ok(())
}
