//! Reactive container for the application state.
//!
//! The container holds one immutable [`AppState`] snapshot at a time. Every
//! change replaces the snapshot wholesale and notifies each listener, in
//! order, exactly once with the new value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use mockchat_shared::AppState;

type Listener = Arc<dyn Fn(&Arc<AppState>) + Send + Sync>;

/// Handle returned by [`StateContainer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct StateContainer {
    current: RwLock<Arc<AppState>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    /// Serializes replace-and-notify so listeners observe changes in order.
    writer: Mutex<()>,
    next_id: AtomicU64,
}

impl StateContainer {
    pub fn new(initial: AppState) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            listeners: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<AppState> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the state.
    pub fn set(&self, state: AppState) {
        self.update(|_| state);
    }

    /// Derive the next state from the current one.
    ///
    /// Listeners run synchronously before `update` returns and must not call
    /// back into `set`/`update`.
    pub fn update(&self, f: impl FnOnce(&AppState) -> AppState) {
        let _writer = self.lock_writer();
        let next = Arc::new(f(&self.get()));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        self.notify(&next);
    }

    /// Register `listener`. It is called right away with the current snapshot,
    /// then after every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<AppState>) + Send + Sync + 'static,
    {
        let _writer = self.lock_writer();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        listener(&self.get());
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, snapshot: &Arc<AppState>) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> AppState {
        let mut state = AppState::defaults_at(0);
        state.group_settings.name = name.to_string();
        state
    }

    fn recording(container: &StateContainer) -> (SubscriptionId, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = container.subscribe(move |s| {
            sink.lock().unwrap().push(s.group_settings.name.clone());
        });
        (id, seen)
    }

    #[test]
    fn subscribe_fires_immediately_then_per_change() {
        let container = StateContainer::new(named("a"));
        let (_, seen) = recording(&container);

        container.set(named("b"));
        container.update(|s| {
            let mut next = s.clone();
            next.group_settings.name = "c".into();
            next
        });

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(container.get().group_settings.name, "c");
    }

    #[test]
    fn snapshots_are_not_mutated_in_place() {
        let container = StateContainer::new(named("a"));
        let before = container.get();
        container.set(named("b"));
        assert_eq!(before.group_settings.name, "a");
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let container = StateContainer::new(named("a"));
        let (id, seen) = recording(&container);

        assert!(container.unsubscribe(id));
        assert!(!container.unsubscribe(id));
        container.set(named("b"));

        assert_eq!(*seen.lock().unwrap(), vec!["a"]);
    }
}
