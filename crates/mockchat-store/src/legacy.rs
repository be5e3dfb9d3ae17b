//! Legacy persistence: the whole state as one JSON blob in a synchronous
//! key/value medium.
//!
//! Kept for installations that predate the SQLite store. New sessions only
//! read from it during the one-shot migration (see
//! [`DurableStore::migrate_legacy`](crate::DurableStore::migrate_legacy)).

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use mockchat_shared::constants::{LEGACY_DEBOUNCE_MS, LEGACY_STORAGE_KEY};
use mockchat_shared::AppState;
use serde_json::json;
use tracing::debug;

use crate::codec::{encode_state, parse_state};
use crate::debounce::Debouncer;
use crate::error::{Result, StoreError};
use crate::medium::KeyValueMedium;
use crate::report::{report, report_with, Reported};

struct LegacyInner {
    medium: Option<Box<dyn KeyValueMedium>>,
    key: String,
}

impl LegacyInner {
    fn read(&self) -> Result<Option<AppState>> {
        let Some(medium) = self.medium.as_deref() else {
            return Ok(None);
        };
        match medium.get_item(&self.key)? {
            Some(raw) if !raw.is_empty() => parse_state(&raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Store `state`. Returns `Ok(false)` when the quota recovery failed;
    /// both the quota error and the failed recovery have been reported then.
    fn write(&self, state: &AppState) -> Result<bool> {
        let Some(medium) = self.medium.as_deref() else {
            return Ok(false);
        };
        let raw = encode_state(state)?;
        match medium.set_item(&self.key, &raw) {
            Err(e @ StoreError::QuotaExceeded { .. }) => {
                report("legacy:saveImmediate", &e);
                if let Err(e) = self.recover(medium, &raw) {
                    report_with("legacy:saveImmediate", &e, &json!({ "recovery": true }));
                    return Ok(false);
                }
            }
            other => other?,
        }
        debug!(key = %self.key, bytes = raw.len(), "legacy state written");
        Ok(true)
    }

    /// Drop the current entry and retry. If the retry fails too, the previous
    /// entry is put back.
    fn recover(&self, medium: &dyn KeyValueMedium, raw: &str) -> Result<()> {
        let previous = medium.get_item(&self.key)?;
        medium.remove_item(&self.key)?;

        let Err(e) = medium.set_item(&self.key, raw) else {
            return Ok(());
        };
        if let Some(previous) = previous {
            if let Err(restore) = medium.set_item(&self.key, &previous) {
                report("legacy:restore", &restore);
            }
        }
        Err(e)
    }

    fn write_reported(&self, state: &AppState) -> bool {
        match self.write(state) {
            Ok(stored) => stored,
            Err(e) => {
                report("legacy:saveImmediate", &e);
                false
            }
        }
    }
}

/// Synchronous store over a [`KeyValueMedium`].
///
/// A store built with [`LegacyStore::unavailable`] has no medium; every
/// operation is then a no-op.
pub struct LegacyStore {
    inner: Arc<LegacyInner>,
    debounce: Debouncer<Arc<AppState>>,
}

impl LegacyStore {
    pub fn new(medium: impl KeyValueMedium + 'static) -> Self {
        Self::with_options(
            Some(Box::new(medium)),
            LEGACY_STORAGE_KEY,
            Duration::from_millis(LEGACY_DEBOUNCE_MS),
        )
    }

    pub fn unavailable() -> Self {
        Self::with_options(
            None,
            LEGACY_STORAGE_KEY,
            Duration::from_millis(LEGACY_DEBOUNCE_MS),
        )
    }

    pub fn with_options(
        medium: Option<Box<dyn KeyValueMedium>>,
        key: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let inner = Arc::new(LegacyInner {
            medium,
            key: key.into(),
        });
        let writer = Arc::clone(&inner);
        let debounce = Debouncer::new(delay, move |_ticket, state: Arc<AppState>| {
            let writer = Arc::clone(&writer);
            Box::pin(async move {
                writer.write_reported(&state);
            }) as BoxFuture<'static, ()>
        });
        Self { inner, debounce }
    }

    pub fn is_available(&self) -> bool {
        self.inner.medium.is_some()
    }

    /// The stored state, or `None` if absent, unreadable or malformed.
    pub fn load(&self) -> Option<AppState> {
        self.inner.read().reported("legacy:load").flatten()
    }

    /// Schedule a write of `state` after the quiet interval. Outside a tokio
    /// runtime the write happens right away.
    pub fn save(&self, state: impl Into<Arc<AppState>>) {
        if !self.is_available() {
            return;
        }
        if !self.debounce.schedule(state.into()) {
            self.flush();
        }
    }

    /// Validate and write `state` right away. Returns whether it was stored.
    pub fn save_immediate(&self, state: &AppState) -> bool {
        self.is_available() && self.inner.write_reported(state)
    }

    /// Perform any pending debounced write now.
    pub fn flush(&self) {
        if let Some((_, state)) = self.debounce.take_pending() {
            self.inner.write_reported(&state);
        }
    }

    /// Drop a pending debounced write without performing it.
    pub fn cancel_pending(&self) -> bool {
        self.debounce.cancel()
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Remove the stored entry. A pending debounced write is discarded first
    /// so it cannot resurrect the cleared state.
    pub fn clear(&self) {
        self.cancel_pending();
        let Some(medium) = self.inner.medium.as_deref() else {
            return;
        };
        if medium.remove_item(&self.inner.key).reported("legacy:clear").is_some() {
            debug!(key = %self.inner.key, "legacy state cleared");
        }
    }
}
