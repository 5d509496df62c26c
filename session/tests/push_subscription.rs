//! Integration tests for push-driven session changes and subscriptions.

#![allow(clippy::unwrap_used)]

use farehop_session::{
    AuthenticatedUser, MockIdentityProvider, SessionChange, SessionConfig, SessionController,
    SessionStatus, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_err;

async fn initialized_controller(
    provider: &MockIdentityProvider,
) -> SessionController<MockIdentityProvider> {
    let mut controller = SessionController::new(provider.clone(), SessionConfig::default());
    controller.initialize().await.unwrap();
    controller
}

/// Assert that no change arrives within a short grace period.
async fn assert_no_change(watcher: &mut farehop_session::SessionWatcher) {
    let outcome = tokio::time::timeout(Duration::from_millis(50), watcher.next()).await;
    assert!(outcome.is_err(), "unexpected session change delivered");
}

#[tokio::test]
async fn test_push_signed_in_updates_session() {
    let provider = MockIdentityProvider::new();
    let controller = initialized_controller(&provider).await;
    let mut watcher = controller.subscribe();

    let user = AuthenticatedUser::new(UserId::new(), "elsewhere@example.com");
    provider.push(SessionChange::SignedIn(user.clone())).await;

    let session = watcher.next().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.user(), Some(&user));
    assert_eq!(controller.current(), session);
}

#[tokio::test]
async fn test_push_signed_out_clears_session() {
    let provider = MockIdentityProvider::new();
    let user = provider.register("rider@example.com", "pw");
    provider.set_current(Some(user));

    let controller = initialized_controller(&provider).await;
    assert!(controller.current().is_authenticated());
    let mut watcher = controller.subscribe();

    // Remote logout from another device.
    provider.push(SessionChange::SignedOut).await;

    let session = watcher.next().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_exactly_one_delivery_per_event() {
    let provider = MockIdentityProvider::new();
    let controller = initialized_controller(&provider).await;
    let mut watcher = controller.subscribe();

    let user = AuthenticatedUser::new(UserId::new(), "a@b.com");
    provider.push(SessionChange::SignedIn(user)).await;
    provider.push(SessionChange::SignedOut).await;

    let first = watcher.next().await.unwrap();
    let second = watcher.next().await.unwrap();
    assert_eq!(first.status(), SessionStatus::Authenticated);
    assert_eq!(second.status(), SessionStatus::Unauthenticated);

    // Two events, two deliveries, nothing more.
    assert_no_change(&mut watcher).await;
}

#[tokio::test]
async fn test_local_operations_notify_subscribers() {
    let provider = MockIdentityProvider::new().with_account("a@b.com", "pw");
    let controller = initialized_controller(&provider).await;
    let mut watcher = controller.subscribe();

    controller.sign_in("a@b.com", "pw").await.unwrap();
    let session = watcher.next().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Authenticated);

    controller.sign_out().await.unwrap();
    let session = watcher.next().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn test_dropped_watcher_stops_receiving() {
    let provider = MockIdentityProvider::new();
    let controller = initialized_controller(&provider).await;

    let mut watcher = controller.subscribe();
    let user = AuthenticatedUser::new(UserId::new(), "a@b.com");
    provider.push(SessionChange::SignedIn(user)).await;
    watcher.next().await.unwrap();
    drop(watcher);

    // The controller keeps tracking pushes; only the watcher is gone.
    let mut late_watcher = controller.subscribe();
    provider.push(SessionChange::SignedOut).await;
    let session = late_watcher.next().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert_eq!(controller.current().status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn test_duplicate_initialize_delivers_push_once() {
    let provider = MockIdentityProvider::new();
    let mut controller = SessionController::new(provider.clone(), SessionConfig::default());
    controller.initialize().await.unwrap();
    controller.initialize().await.unwrap();

    let mut watcher = controller.subscribe();
    let user = AuthenticatedUser::new(UserId::new(), "a@b.com");
    provider.push(SessionChange::SignedIn(user)).await;

    watcher.next().await.unwrap();
    assert_no_change(&mut watcher).await;
}

#[tokio::test(start_paused = true)]
async fn test_remote_logout_during_failed_sign_in_wins() {
    let provider = MockIdentityProvider::new()
        .with_account("a@b.com", "pw")
        .with_latency(Duration::from_millis(100));
    let mut controller = SessionController::new(provider.clone(), SessionConfig::default());
    controller.initialize().await.unwrap();
    controller.sign_in("a@b.com", "pw").await.unwrap();

    provider.fail_next("rate limited");
    let controller = Arc::new(controller);
    let handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.sign_in("a@b.com", "pw").await })
    };

    // Let the retry reach the provider, then revoke the session remotely
    // while the call is still in flight.
    tokio::time::sleep(Duration::from_millis(1)).await;
    provider.push(SessionChange::SignedOut).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(controller.current().status(), SessionStatus::Unauthenticated);

    assert_err!(handle.await.unwrap());

    // The failed sign-in records its error without resurrecting the
    // remotely revoked user.
    let session = controller.current();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.user().is_none());
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn test_lagged_watcher_skips_to_retained_events() {
    let provider = MockIdentityProvider::new().with_account("a@b.com", "pw");
    let config = SessionConfig::new().with_change_buffer(2);
    let mut controller = SessionController::new(provider, config);
    controller.initialize().await.unwrap();

    let mut watcher = controller.subscribe();

    // Five changes against a buffer of two; the watcher consumes none.
    controller.sign_in("a@b.com", "pw").await.unwrap();
    controller.sign_out().await.unwrap();
    controller.sign_in("a@b.com", "pw").await.unwrap();
    controller.sign_out().await.unwrap();
    controller.sign_in("a@b.com", "pw").await.unwrap();

    // Delivery resumes at the oldest retained change and stays in order.
    let first = watcher.next().await.unwrap();
    assert_eq!(first.status(), SessionStatus::Unauthenticated);
    let second = watcher.next().await.unwrap();
    assert_eq!(second.status(), SessionStatus::Authenticated);
    assert_no_change(&mut watcher).await;
}

#[tokio::test]
async fn test_shutdown_cancels_push_subscription_idempotently() {
    let provider = MockIdentityProvider::new();
    let mut controller = initialized_controller(&provider).await;
    assert_eq!(provider.subscription_count(), 1);

    controller.shutdown();
    // Double-cancellation is a no-op, not an error.
    controller.shutdown();

    // Give the aborted task a chance to wind down.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(provider.subscription_count(), 0);

    // Pushes no longer reach the controller.
    let before = controller.current();
    let user = AuthenticatedUser::new(UserId::new(), "a@b.com");
    provider.push(SessionChange::SignedIn(user)).await;
    let mut watcher = controller.subscribe();
    assert_no_change(&mut watcher).await;
    assert_eq!(controller.current(), before);
}

#[tokio::test]
async fn test_drop_cancels_push_subscription() {
    let provider = MockIdentityProvider::new();
    let controller = initialized_controller(&provider).await;
    assert_eq!(provider.subscription_count(), 1);

    drop(controller);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(provider.subscription_count(), 0);
}
