//! Synchronous key/value media backing the legacy store.
//!
//! A medium is a flat string-to-string map with an optional byte quota, in the
//! spirit of browser local storage. A replacement is staged before the old
//! entry is released, so it has to fit alongside the value it replaces.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{Result, StoreError};

/// A synchronous string key/value store.
pub trait KeyValueMedium: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Fails with [`StoreError::QuotaExceeded`] when the medium is full.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

fn check_quota(quota: Option<u64>, used: u64, incoming: u64) -> Result<()> {
    match quota {
        Some(quota) if used + incoming > quota => Err(StoreError::QuotaExceeded {
            needed: used + incoming,
            quota,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// In-memory medium
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota: Option<u64>,
    writes: usize,
}

impl MemoryInner {
    fn used(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

/// In-memory medium. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that holds at most `bytes` of keys plus values.
    pub fn with_quota(bytes: u64) -> Self {
        let medium = Self::default();
        medium.lock().quota = Some(bytes);
        medium
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful `set_item` calls so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Store `value` bypassing the quota, e.g. to seed a test fixture.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().entries.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        let incoming = (key.len() + value.len()) as u64;
        check_quota(inner.quota, inner.used(), incoming)?;
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock().entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed medium
// ---------------------------------------------------------------------------

const ENTRY_EXTENSION: &str = "json";

/// One file per key inside a directory.
///
/// Writes go to a temporary file that is renamed over the entry, so a failed
/// write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileMedium {
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(path = %dir.display(), ?quota, "opened file medium");
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a key to its entry file, rejecting anything that could escape `dir`.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let mut components = Path::new(key).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if key.is_empty() || !single_normal || key.contains(['/', '\\']) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{ENTRY_EXTENSION}")))
    }

    fn used(&self) -> Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueMedium for FileMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        check_quota(self.quota, self.used()?, value.len() as u64)?;

        let staging = self.dir.join(format!(".{key}.tmp"));
        if let Err(e) = fs::write(&staging, value) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_quota_counts_replaced_entry() {
        let medium = MemoryMedium::with_quota(20);
        medium.set_item("k", "0123456789").unwrap();

        // 11 bytes held + 11 incoming > 20
        let err = medium.set_item("k", "abcdefghij").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert_eq!(medium.raw("k").as_deref(), Some("0123456789"));

        medium.remove_item("k").unwrap();
        medium.set_item("k", "abcdefghij").unwrap();
        assert_eq!(medium.writes(), 2);
    }

    #[test]
    fn file_medium_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path(), None).unwrap();

        assert_eq!(medium.get_item("state").unwrap(), None);
        medium.set_item("state", "{\"a\":1}").unwrap();
        assert_eq!(medium.get_item("state").unwrap().as_deref(), Some("{\"a\":1}"));

        medium.remove_item("state").unwrap();
        medium.remove_item("state").unwrap();
        assert_eq!(medium.get_item("state").unwrap(), None);
    }

    #[test]
    fn file_medium_enforces_quota() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path(), Some(16)).unwrap();

        medium.set_item("state", "0123456789").unwrap();
        assert!(matches!(
            medium.set_item("state", "0123456789"),
            Err(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(medium.get_item("state").unwrap().as_deref(), Some("0123456789"));
    }

    #[test]
    fn file_medium_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::open(dir.path(), None).unwrap();

        for key in ["../escape", "a/b", "..", "", "a\\b"] {
            assert!(matches!(
                medium.set_item(key, "x"),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }
}
