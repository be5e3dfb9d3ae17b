//! Durable persistence: the state blob as a row of the SQLite `kv` table.
//!
//! The connection is opened lazily on first use and memoized for the life of
//! the store, including a failed open. Queries run on the blocking pool.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use mockchat_shared::constants::{DURABLE_DEBOUNCE_MS, DURABLE_STATE_KEY};
use mockchat_shared::AppState;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::codec::{encode_state, parse_state};
use crate::database::{Database, DbLocation};
use crate::debounce::Debouncer;
use crate::error::{Result, StoreError};
use crate::legacy::LegacyStore;
use crate::report::{report, Reported};

/// The open database plus the ticket of the newest debounced write applied.
struct Connected {
    db: Database,
    applied_ticket: u64,
}

type ConnHandle = Arc<Mutex<Connected>>;

struct DurableInner {
    location: Option<DbLocation>,
    key: String,
    conn: OnceCell<Option<ConnHandle>>,
    inits: AtomicUsize,
    writes: AtomicU64,
}

impl DurableInner {
    /// Shared connection, opened on first call. Concurrent first callers wait
    /// on the same initialization; a failure is remembered as `None`.
    async fn connection(&self) -> Option<ConnHandle> {
        let location = self.location.clone()?;
        self.conn
            .get_or_init(|| async move {
                self.inits.fetch_add(1, Ordering::SeqCst);
                let opened = tokio::task::spawn_blocking(move || Database::open(&location))
                    .await
                    .map_err(StoreError::from)
                    .and_then(|db| db);
                opened
                    .map(|db| {
                        Arc::new(Mutex::new(Connected {
                            db,
                            applied_ticket: 0,
                        }))
                    })
                    .reported("durable:init")
            })
            .await
            .clone()
    }

    /// Run `f` against the connection on the blocking pool. `Ok(None)` means
    /// there is no connection.
    async fn with_db<T, F>(&self, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Connected) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let Some(handle) = self.connection().await else {
            return Ok(None);
        };
        let out = tokio::task::spawn_blocking(move || {
            let mut connected = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut connected)
        })
        .await??;
        Ok(Some(out))
    }

    async fn read(&self) -> Result<Option<AppState>> {
        let key = self.key.clone();
        let raw = self
            .with_db(move |c| c.db.get_value(&key))
            .await?
            .flatten();
        match raw {
            Some(raw) => parse_state(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Upsert `state`. A debounced write passes its ticket and is skipped if
    /// a newer one already landed.
    async fn write(&self, state: &AppState, ticket: Option<u64>) -> Result<()> {
        let raw = encode_state(state)?;
        let key = self.key.clone();
        let applied = self
            .with_db(move |c| {
                if let Some(ticket) = ticket {
                    if ticket < c.applied_ticket {
                        return Ok(false);
                    }
                    c.applied_ticket = ticket;
                }
                c.db.put_value(&key, &raw)?;
                Ok(true)
            })
            .await?
            .ok_or(StoreError::Unavailable)?;

        if applied {
            self.writes.fetch_add(1, Ordering::SeqCst);
            debug!(key = %self.key, ?ticket, "durable state written");
        } else {
            debug!(key = %self.key, ?ticket, "skipping superseded write");
        }
        Ok(())
    }

    async fn write_reported(&self, state: &AppState, ticket: Option<u64>) {
        match self.write(state, ticket).await {
            Ok(()) => {}
            // The failed open has already been reported.
            Err(StoreError::Unavailable) => debug!("durable store unavailable; write dropped"),
            Err(e) => report("durable:writeState", &e),
        }
    }

    async fn delete(&self) -> Result<()> {
        let key = self.key.clone();
        if let Some(true) = self.with_db(move |c| c.db.delete_value(&key)).await? {
            debug!(key = %self.key, "durable state cleared");
        }
        Ok(())
    }
}

/// Asynchronous store backed by SQLite.
///
/// Owns the [`LegacyStore`] it migrates from and purges on [`clear`](Self::clear).
pub struct DurableStore {
    inner: Arc<DurableInner>,
    debounce: Debouncer<Arc<AppState>>,
    legacy: LegacyStore,
}

impl DurableStore {
    pub fn new(location: DbLocation, legacy: LegacyStore) -> Self {
        Self::with_options(
            Some(location),
            legacy,
            DURABLE_STATE_KEY,
            Duration::from_millis(DURABLE_DEBOUNCE_MS),
        )
    }

    /// A store with no database; every operation is a no-op.
    pub fn unavailable(legacy: LegacyStore) -> Self {
        Self::with_options(
            None,
            legacy,
            DURABLE_STATE_KEY,
            Duration::from_millis(DURABLE_DEBOUNCE_MS),
        )
    }

    pub fn with_options(
        location: Option<DbLocation>,
        legacy: LegacyStore,
        key: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let inner = Arc::new(DurableInner {
            location,
            key: key.into(),
            conn: OnceCell::new(),
            inits: AtomicUsize::new(0),
            writes: AtomicU64::new(0),
        });
        let writer = Arc::clone(&inner);
        let debounce = Debouncer::new(delay, move |ticket, state: Arc<AppState>| {
            let writer = Arc::clone(&writer);
            Box::pin(async move {
                writer.write_reported(&state, Some(ticket)).await;
            }) as BoxFuture<'static, ()>
        });
        Self {
            inner,
            debounce,
            legacy,
        }
    }

    pub fn legacy(&self) -> &LegacyStore {
        &self.legacy
    }

    pub fn is_available(&self) -> bool {
        self.inner.location.is_some()
    }

    /// Number of upserts executed against the database so far.
    pub fn writes_issued(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// The stored state, or `None` if absent, malformed, or on any failure.
    pub async fn load(&self) -> Option<AppState> {
        self.inner
            .read()
            .await
            .reported("durable:loadPersistedState")
            .flatten()
    }

    /// Schedule an upsert of `state` after the quiet interval.
    ///
    /// Outside a tokio runtime no timer can be armed; the state stays pending
    /// until the next [`flush`](Self::flush).
    pub fn save(&self, state: impl Into<Arc<AppState>>) {
        if !self.is_available() {
            return;
        }
        if !self.debounce.schedule(state.into()) {
            report("durable:saveState", &StoreError::NoRuntime);
        }
    }

    /// Perform any pending debounced write now; returns once it has landed.
    pub async fn flush(&self) {
        if let Some((ticket, state)) = self.debounce.take_pending() {
            self.inner.write_reported(&state, Some(ticket)).await;
        }
    }

    /// Drop a pending debounced write without performing it.
    pub fn cancel_pending(&self) -> bool {
        self.debounce.cancel()
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Delete the stored row and purge the legacy medium. Pending debounced
    /// writes are discarded first so they cannot resurrect the old state.
    pub async fn clear(&self) {
        self.cancel_pending();
        if let Err(e) = self.inner.delete().await {
            report("durable:clearPersistedState", &e);
        }
        self.legacy.clear();
    }

    /// Move a valid legacy state into the database, then purge it from the
    /// legacy medium.
    ///
    /// Returns the legacy state, or `None` when there was nothing valid to
    /// migrate. If the database write fails the legacy entry is kept so a
    /// later start can retry.
    pub async fn migrate_legacy(&self) -> Option<AppState> {
        if !self.is_available() {
            return None;
        }
        let state = self.legacy.load()?;

        match self.inner.write(&state, None).await {
            Ok(()) => {
                self.legacy.clear();
                info!(
                    users = state.users.len(),
                    messages = state.messages.len(),
                    "migrated legacy state into durable store"
                );
            }
            Err(e) => {
                report("durable:migrateLegacy", &e);
                warn!("legacy state kept for a later migration attempt");
            }
        }
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use crate::codec::tests::decorated_state;
    use crate::report::tests::capture_reports;
    use mockchat_shared::constants::LEGACY_STORAGE_KEY;
    use mockchat_shared::{PhoneTheme, User};
    use serde_json::json;

    fn state_with_group(name: &str) -> AppState {
        let mut state = AppState::defaults_at(1_700_000_000_000);
        state.group_settings.name = name.to_string();
        state
    }

    fn memory_store() -> (DurableStore, MemoryMedium) {
        let medium = MemoryMedium::new();
        let store = DurableStore::new(DbLocation::Memory, LegacyStore::new(medium.clone()));
        (store, medium)
    }

    async fn wait_for_writes(store: &DurableStore, n: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.writes_issued() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("debounced write never landed");
    }

    #[tokio::test]
    async fn empty_database_loads_none() {
        let (store, _) = memory_store();
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn save_flush_load_round_trips() {
        let (store, _) = memory_store();
        let state = state_with_group("Road trip");

        store.save(state.clone());
        store.flush().await;

        assert_eq!(store.load().await, Some(state));
        assert_eq!(store.writes_issued(), 1);
    }

    #[tokio::test]
    async fn decorated_state_round_trips() {
        let (store, _) = memory_store();
        let state = decorated_state();

        store.save(state.clone());
        store.flush().await;

        assert_eq!(store.load().await, Some(state));
    }

    #[test]
    fn save_outside_runtime_is_deferred_until_flush() {
        let (store, _) = memory_store();

        let ((), reports) = capture_reports(|| store.save(state_with_group("sync caller")));
        assert!(store.has_pending());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["kind"], "unavailable");

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            store.flush().await;
            assert_eq!(store.load().await, Some(state_with_group("sync caller")));
        });
        assert_eq!(store.writes_issued(), 1);
    }

    #[tokio::test]
    async fn debounced_saves_coalesce_into_one_upsert() {
        let (store, _) = memory_store();

        store.save(state_with_group("one"));
        store.save(state_with_group("two"));
        store.save(state_with_group("three"));
        assert!(store.has_pending());

        wait_for_writes(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(store.writes_issued(), 1);
        assert_eq!(store.load().await, Some(state_with_group("three")));
    }

    #[tokio::test]
    async fn flush_supersedes_timer() {
        let (store, _) = memory_store();

        store.save(state_with_group("now"));
        store.flush().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(store.writes_issued(), 1);
        assert!(!store.has_pending());
    }

    #[tokio::test]
    async fn invalid_state_is_never_written() {
        let (store, _) = memory_store();
        let mut state = state_with_group("bad");
        state.users.push(User::new("u", "", "#fff"));

        store.save(state);
        store.flush().await;

        assert_eq!(store.writes_issued(), 0);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn malformed_row_loads_none() {
        let (store, _) = memory_store();
        store
            .inner
            .with_db(|c| c.db.put_value(DURABLE_STATE_KEY, r#"{"users": "nope"}"#))
            .await
            .unwrap();

        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn stale_ticket_does_not_overwrite_newer_state() {
        let (store, _) = memory_store();

        store.inner.write(&state_with_group("new"), Some(5)).await.unwrap();
        store.inner.write(&state_with_group("old"), Some(4)).await.unwrap();

        assert_eq!(store.load().await, Some(state_with_group("new")));
        assert_eq!(store.writes_issued(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_connection() {
        let (store, _) = memory_store();

        let (a, b) = tokio::join!(store.inner.connection(), store.inner.connection());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.inner.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_open_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = DurableStore::new(
            DbLocation::in_dir(&blocker),
            LegacyStore::new(MemoryMedium::new()),
        );

        assert_eq!(store.load().await, None);
        store.save(state_with_group("x"));
        store.flush().await;
        store.clear().await;
        assert_eq!(store.load().await, None);

        assert_eq!(store.inner.inits.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes_issued(), 0);
    }

    #[tokio::test]
    async fn migration_moves_legacy_state_once() {
        let (store, medium) = memory_store();
        let legacy_state = state_with_group("from legacy");
        assert!(store.legacy().save_immediate(&legacy_state));

        assert_eq!(store.migrate_legacy().await, Some(legacy_state.clone()));
        assert_eq!(store.load().await, Some(legacy_state));
        assert_eq!(medium.raw(LEGACY_STORAGE_KEY), None);

        assert_eq!(store.migrate_legacy().await, None);
        assert_eq!(store.writes_issued(), 1);
        assert_eq!(medium.writes(), 1);
    }

    #[tokio::test]
    async fn legacy_state_with_mistyped_theme_is_migrated() {
        let (store, medium) = memory_store();
        let mut blob = serde_json::to_value(state_with_group("themed")).unwrap();
        blob["phoneTheme"]["frameGradientAngle"] = json!("135");
        blob["phoneTheme"]["frameColor1"] = json!(null);
        blob["groupSettings"]["avatar"] = json!(5);
        medium.insert_raw(LEGACY_STORAGE_KEY, &blob.to_string());

        let migrated = store.migrate_legacy().await.unwrap();
        assert_eq!(migrated.group_settings.name, "themed");
        assert_eq!(migrated.group_settings.avatar, None);
        assert_eq!(migrated.phone_theme, PhoneTheme::default());
        assert_eq!(store.load().await, Some(migrated));
        assert_eq!(medium.raw(LEGACY_STORAGE_KEY), None);
    }

    #[tokio::test]
    async fn invalid_legacy_state_is_not_migrated() {
        let (store, medium) = memory_store();
        medium.insert_raw(LEGACY_STORAGE_KEY, r#"{"users": [{"id": ""}]}"#);

        assert_eq!(store.migrate_legacy().await, None);
        assert_eq!(store.writes_issued(), 0);
        assert!(medium.raw(LEGACY_STORAGE_KEY).is_some());
    }

    #[tokio::test]
    async fn failed_migration_keeps_legacy_entry() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let medium = MemoryMedium::new();
        let store = DurableStore::new(
            DbLocation::in_dir(&blocker),
            LegacyStore::new(medium.clone()),
        );
        let legacy_state = state_with_group("precious");
        assert!(store.legacy().save_immediate(&legacy_state));

        assert_eq!(store.migrate_legacy().await, Some(legacy_state));
        assert!(medium.raw(LEGACY_STORAGE_KEY).is_some());
    }

    #[tokio::test]
    async fn clear_purges_both_media_and_pending_write() {
        let (store, medium) = memory_store();
        store.save(state_with_group("stored"));
        store.flush().await;
        assert!(store.legacy().save_immediate(&state_with_group("legacy")));

        store.save(state_with_group("stale"));
        store.clear().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(store.load().await, None);
        assert_eq!(medium.raw(LEGACY_STORAGE_KEY), None);
        assert_eq!(store.writes_issued(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_is_inert() {
        let store = DurableStore::unavailable(LegacyStore::new(MemoryMedium::new()));
        assert!(store.legacy().save_immediate(&state_with_group("legacy")));

        assert_eq!(store.load().await, None);
        assert_eq!(store.migrate_legacy().await, None);
        store.save(state_with_group("x"));
        assert!(!store.has_pending());
        store.flush().await;
        assert!(store.legacy().load().is_some());
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_group("persisted");

        let store = DurableStore::new(DbLocation::in_dir(dir.path()), LegacyStore::unavailable());
        store.save(state.clone());
        store.flush().await;
        drop(store);

        let reopened =
            DurableStore::new(DbLocation::in_dir(dir.path()), LegacyStore::unavailable());
        assert_eq!(reopened.load().await, Some(state));
    }
}
