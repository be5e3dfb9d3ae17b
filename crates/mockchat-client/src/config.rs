//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can start with zero
//! configuration.

use std::path::PathBuf;

use mockchat_shared::constants::DEFAULT_LEGACY_QUOTA_BYTES;
use mockchat_store::{
    default_data_dir, DbLocation, DurableStore, FileMedium, LegacyStore, Result,
};

use crate::coordinator::Backend;

/// Which persistence backend the coordinator writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Durable,
    Legacy,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "durable" | "sqlite" => Ok(BackendKind::Durable),
            "legacy" | "kv" => Ok(BackendKind::Legacy),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Active persistence backend.
    /// Env: `MOCKCHAT_BACKEND` (`durable` / `legacy`)
    /// Default: `durable`
    pub backend: BackendKind,

    /// Directory holding both the SQLite database and the legacy entries.
    /// Env: `MOCKCHAT_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Capacity of the legacy key/value medium in bytes.
    /// Env: `MOCKCHAT_LEGACY_QUOTA_BYTES`
    /// Default: 5 MiB
    pub legacy_quota_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Durable,
            data_dir: None,
            legacy_quota_bytes: DEFAULT_LEGACY_QUOTA_BYTES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("MOCKCHAT_BACKEND") {
            match value.parse() {
                Ok(kind) => config.backend = kind,
                Err(e) => tracing::warn!(error = %e, "Invalid MOCKCHAT_BACKEND, using default"),
            }
        }

        if let Some(dir) = lookup("MOCKCHAT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(value) = lookup("MOCKCHAT_LEGACY_QUOTA_BYTES") {
            match value.trim().parse::<u64>() {
                Ok(bytes) => config.legacy_quota_bytes = bytes,
                Err(e) => tracing::warn!(
                    value = %value,
                    error = %e,
                    "Invalid MOCKCHAT_LEGACY_QUOTA_BYTES, using default"
                ),
            }
        }

        config
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// Build the configured backend. A medium that cannot be opened leaves
    /// its store unavailable rather than failing startup.
    pub fn build_backend(&self) -> Backend {
        let data_dir = match self.data_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                tracing::error!(error = %e, "no data directory; persistence disabled");
                None
            }
        };

        let legacy = data_dir
            .as_ref()
            .map(|dir| FileMedium::open(dir.join("legacy"), Some(self.legacy_quota_bytes)))
            .transpose()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "legacy medium unavailable");
                None
            })
            .map(LegacyStore::new)
            .unwrap_or_else(LegacyStore::unavailable);

        match (self.backend, data_dir) {
            (BackendKind::Legacy, _) => Backend::Legacy(legacy),
            (BackendKind::Durable, Some(dir)) => {
                Backend::Durable(DurableStore::new(DbLocation::in_dir(&dir), legacy))
            }
            (BackendKind::Durable, None) => Backend::Durable(DurableStore::unavailable(legacy)),
        }
    }
}
