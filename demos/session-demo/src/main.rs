//! Session controller demo binary
//!
//! Walks a sign-up / sign-in / remote-logout flow against the in-memory
//! mock provider and prints each observed session change.

use farehop_session::{
    Metadata, MockIdentityProvider, SessionChange, SessionConfig, SessionController,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> farehop_session::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_demo=debug,farehop_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Farehop Session Controller Demo ===\n");
    tracing::info!("starting session demo");

    let provider = MockIdentityProvider::new().with_account("rider@example.com", "hunter2");
    let mut controller = SessionController::new(provider.clone(), SessionConfig::default());

    // Watch every session change on the side.
    let mut watcher = controller.subscribe();
    let observer = tokio::spawn(async move {
        while let Some(session) = watcher.next().await {
            println!(
                "  [watcher] status={:?} user={:?}",
                session.status(),
                session.user().map(|u| u.email.as_str())
            );
        }
    });

    println!(">>> initialize()");
    let session = controller.initialize().await?;
    println!("Resolved: {:?}\n", session.status());

    println!(">>> sign_in(\"rider@example.com\", \"wrong\")");
    match controller.sign_in("rider@example.com", "wrong").await {
        Ok(_) => println!("unexpected success"),
        Err(error) => println!("Rejected: {error}\n"),
    }

    println!(">>> sign_in(\"rider@example.com\", \"hunter2\")");
    let user = controller.sign_in("rider@example.com", "hunter2").await?;
    println!("Signed in as {}\n", user.email);

    println!(">>> sign_up(\"new-rider@example.com\", ...)");
    let mut metadata = Metadata::new();
    metadata.insert("display_name".to_string(), serde_json::json!("New Rider"));
    let user = controller
        .sign_up("new-rider@example.com", "s3cret", metadata)
        .await?;
    println!("Registered {}\n", user.email);

    println!(">>> provider push: remote logout");
    provider.push(SessionChange::SignedOut).await;
    tokio::task::yield_now().await;

    println!(">>> reset_password(\"rider@example.com\")");
    controller.reset_password("rider@example.com").await?;
    println!("Reset requests: {:?}\n", provider.reset_requests());

    controller.shutdown();
    drop(controller);
    let _ = observer.await;

    println!("Done.");
    Ok(())
}
