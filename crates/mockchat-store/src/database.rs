//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use mockchat_shared::constants::DURABLE_DATABASE_NAME;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Where the durable database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// A database file on disk.
    File(PathBuf),
    /// A private in-memory database, gone when the connection closes.
    Memory,
}

impl DbLocation {
    /// `<dir>/chat-generator.db`
    pub fn in_dir(dir: &Path) -> Self {
        DbLocation::File(dir.join(format!("{DURABLE_DATABASE_NAME}.db")))
    }
}

/// Platform data directory for the application:
/// - Linux:   `~/.local/share/mockchat`
/// - macOS:   `~/Library/Application Support/com.mockchat.mockchat`
/// - Windows: `{FOLDERID_RoamingAppData}\mockchat\mockchat\data`
pub fn default_data_dir() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "mockchat", "mockchat").ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().to_path_buf())
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(location: &DbLocation) -> Result<Self> {
        match location {
            DbLocation::File(path) => Self::open_at(path),
            DbLocation::Memory => Self::open_in_memory(),
        }
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Relaxed durability.
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}
