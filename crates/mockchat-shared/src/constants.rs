/// Application name
pub const APP_NAME: &str = "mockchat";

/// Key under which the legacy key/value medium stores the serialized state
pub const LEGACY_STORAGE_KEY: &str = "chat-generator-state-v2";

/// Row key of the state blob inside the durable `kv` table
pub const DURABLE_STATE_KEY: &str = "app_state";

/// Logical name of the durable database (file stem on disk)
pub const DURABLE_DATABASE_NAME: &str = "chat-generator";

/// Quiet interval before a debounced legacy write fires
pub const LEGACY_DEBOUNCE_MS: u64 = 300;

/// Quiet interval before a debounced durable write fires
pub const DURABLE_DEBOUNCE_MS: u64 = 200;

/// Default capacity of the file-backed legacy medium (5 MiB)
pub const DEFAULT_LEGACY_QUOTA_BYTES: u64 = 5 * 1024 * 1024;
