pub mod config;
pub mod coordinator;
pub mod lifecycle;
pub mod services;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::{BackendKind, ClientConfig};
pub use coordinator::{Backend, StateCoordinator};
pub use lifecycle::LifecycleEvent;
pub use state::{StateContainer, SubscriptionId};

/// Install the global tracing subscriber. Respects `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("mockchat=debug,mockchat_client=debug,mockchat_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Start a coordinator over the configured backend.
pub async fn start(config: &ClientConfig) -> StateCoordinator {
    tracing::info!(backend = ?config.backend, "Starting mockchat state core");
    StateCoordinator::start(config.build_backend()).await
}
