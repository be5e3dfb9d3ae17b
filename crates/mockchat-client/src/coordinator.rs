//! The state coordinator: owner of the reactive container and the bridge to
//! the active persistence backend.

use std::sync::Arc;

use mockchat_shared::{new_id, now_millis, AppState, Message, PhoneThemePatch, User};
use mockchat_store::{DurableStore, LegacyStore};
use tracing::{debug, info};

use crate::lifecycle::LifecycleEvent;
use crate::state::{StateContainer, SubscriptionId};

/// The persistence backend the coordinator writes through.
pub enum Backend {
    Legacy(LegacyStore),
    /// SQLite store; owns the legacy store it migrates from.
    Durable(DurableStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Legacy(_) => "legacy",
            Backend::Durable(_) => "durable",
        }
    }

    /// Authoritative starting state, if any backend holds one.
    async fn load_initial(&self) -> Option<AppState> {
        match self {
            Backend::Legacy(store) => store.load(),
            Backend::Durable(store) => match store.load().await {
                Some(state) => Some(state),
                None => store.migrate_legacy().await,
            },
        }
    }

    fn save(&self, state: Arc<AppState>) {
        match self {
            Backend::Legacy(store) => store.save(state),
            Backend::Durable(store) => store.save(state),
        }
    }

    pub async fn flush(&self) {
        match self {
            Backend::Legacy(store) => store.flush(),
            Backend::Durable(store) => store.flush().await,
        }
    }

    fn cancel_pending(&self) {
        match self {
            Backend::Legacy(store) => store.cancel_pending(),
            Backend::Durable(store) => store.cancel_pending(),
        };
    }

    async fn clear(&self) {
        match self {
            Backend::Legacy(store) => store.clear(),
            Backend::Durable(store) => store.clear().await,
        }
    }
}

/// Owns the canonical [`StateContainer`] and forwards every snapshot to the
/// backend's debounced save.
///
/// Mutation methods take arguments that were validated by the caller (see
/// [`services`](crate::services)) and apply a pure transition.
pub struct StateCoordinator {
    state: Arc<StateContainer>,
    backend: Arc<Backend>,
    subscription: SubscriptionId,
}

impl StateCoordinator {
    /// Resolve the initial state and start persisting changes.
    ///
    /// For the durable backend the order is: stored state, then a migrated
    /// legacy state, then the compiled-in defaults.
    pub async fn start(backend: Backend) -> Self {
        let backend = Arc::new(backend);
        let initial = match backend.load_initial().await {
            Some(state) => {
                info!(backend = backend.name(), "restored persisted state");
                state
            }
            None => {
                info!(backend = backend.name(), "no persisted state; using defaults");
                AppState::default()
            }
        };

        let state = Arc::new(StateContainer::new(initial));
        let sink = Arc::clone(&backend);
        let subscription = state.subscribe(move |snapshot| sink.save(Arc::clone(snapshot)));

        Self {
            state,
            backend,
            subscription,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<AppState> {
        self.state.get()
    }

    /// The container, for render subscriptions.
    pub fn container(&self) -> &StateContainer {
        &self.state
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    // -- Messages --

    pub fn add_message(&self, text: &str, user_id: &str) -> Message {
        let message = Message::text(new_id(), user_id, text, now_millis());
        let added = message.clone();
        self.state.update(move |s| s.with_message(added));
        message
    }

    pub fn add_image_message(&self, user_id: &str, image_data_url: &str) -> Message {
        let message = Message::image(new_id(), user_id, image_data_url, now_millis());
        let added = message.clone();
        self.state.update(move |s| s.with_message(added));
        message
    }

    pub fn edit_message(&self, message_id: &str, text: &str) {
        self.state.update(|s| s.with_message_text(message_id, text));
    }

    pub fn remove_message(&self, message_id: &str) {
        self.state.update(|s| s.without_message(message_id));
    }

    // -- Users --

    pub fn add_user(&self, name: &str, color: &str) -> User {
        let user = User::new(new_id(), name, color);
        let added = user.clone();
        self.state.update(move |s| s.with_user(added));
        user
    }

    pub fn set_user_avatar(&self, user_id: &str, avatar: Option<&str>) {
        self.state.update(|s| s.with_user_avatar(user_id, avatar));
    }

    pub fn update_user_name(&self, user_id: &str, name: &str) {
        self.state.update(|s| s.with_user_name(user_id, name));
    }

    pub fn set_user_color(&self, user_id: &str, color: &str) {
        self.state.update(|s| s.with_user_color(user_id, color));
    }

    /// Remove a user, its messages and its selection; re-point the current
    /// user if needed.
    pub fn remove_user(&self, user_id: &str) {
        self.state.update(|s| s.without_user(user_id));
    }

    pub fn set_current_user_id(&self, user_id: &str) {
        self.state.update(|s| s.with_current_user(user_id));
    }

    pub fn set_selected_user_ids(&self, ids: &[String]) {
        self.state.update(|s| s.with_selected_users(ids));
    }

    // -- Settings --

    pub fn set_wallpaper(&self, data_url: Option<&str>) {
        self.state.update(|s| s.with_wallpaper(data_url));
    }

    pub fn set_group_name(&self, name: &str) {
        self.state.update(|s| s.with_group_name(name));
    }

    pub fn set_group_avatar(&self, avatar: Option<&str>) {
        self.state.update(|s| s.with_group_avatar(avatar));
    }

    pub fn set_phone_theme(&self, patch: &PhoneThemePatch) {
        self.state.update(|s| s.with_phone_theme(patch));
    }

    /// Restore the defaults and purge persisted data.
    pub async fn reset(&self) {
        self.backend.cancel_pending();
        self.backend.clear().await;
        self.state.set(AppState::default());
        info!(backend = self.backend.name(), "state reset to defaults");
    }

    // -- Lifecycle --

    /// React to a host lifecycle event; hide and unload force a flush.
    pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
        if event.requires_flush() {
            debug!(?event, "flushing pending state");
            self.backend.flush().await;
        }
    }

    /// Flush and stop persisting changes.
    pub async fn shutdown(self) {
        self.backend.flush().await;
        self.state.unsubscribe(self.subscription);
        info!(backend = self.backend.name(), "coordinator stopped");
    }
}
