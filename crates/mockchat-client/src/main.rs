//! # mockchat
//!
//! Headless host for the chat mockup state core. Restores (or migrates) the
//! persisted state, prints it, and flushes pending writes on ctrl-c.

use mockchat_client::lifecycle::before_unload;
use mockchat_client::{init_tracing, start, ClientConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting mockchat v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Restore state
    // -----------------------------------------------------------------------
    let coordinator = start(&config).await;
    let state = coordinator.state();
    info!(
        backend = coordinator.backend().name(),
        users = state.users.len(),
        messages = state.messages.len(),
        group = %state.group_settings.name,
        "State ready"
    );
    println!("{}", serde_json::to_string_pretty(state.as_ref())?);

    // -----------------------------------------------------------------------
    // 4. Wait for shutdown, then flush
    // -----------------------------------------------------------------------
    let event = before_unload().await;
    coordinator.handle_lifecycle(event).await;
    coordinator.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}
