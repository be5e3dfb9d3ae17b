//! Host lifecycle hooks.
//!
//! A pending debounced write must land before the host tears the process
//! down. Hosts translate their own signals (page visibility, window close,
//! ctrl-c) into [`LifecycleEvent`]s and hand them to
//! [`StateCoordinator::handle_lifecycle`](crate::StateCoordinator::handle_lifecycle).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The view went to the background (tab hidden, app minimised).
    Hidden,
    /// The view came back to the foreground.
    Visible,
    /// The process is about to exit.
    BeforeUnload,
}

impl LifecycleEvent {
    pub fn requires_flush(self) -> bool {
        matches!(self, LifecycleEvent::Hidden | LifecycleEvent::BeforeUnload)
    }
}

/// Resolves when the process is asked to stop.
pub async fn before_unload() -> LifecycleEvent {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    LifecycleEvent::BeforeUnload
}
