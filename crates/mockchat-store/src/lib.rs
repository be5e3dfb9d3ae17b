//! # mockchat-store
//!
//! Persistence for the chat mockup state.
//!
//! Two backends hold the same JSON blob:
//! - [`LegacyStore`]: synchronous, over a key/value [`medium`]
//! - [`DurableStore`]: asynchronous, over a lazily opened SQLite [`Database`]
//!
//! Both coalesce saves with a trailing debounce, validate every blob on its
//! way in and out, and report failures through [`report`] instead of
//! returning them.

pub mod codec;
pub mod database;
pub mod debounce;
pub mod durable;
pub mod kv;
pub mod legacy;
pub mod medium;
pub mod migrations;
pub mod report;

mod error;

pub use database::{default_data_dir, Database, DbLocation};
pub use durable::DurableStore;
pub use error::{ErrorKind, Result, StoreError};
pub use legacy::LegacyStore;
pub use medium::{FileMedium, KeyValueMedium, MemoryMedium};
