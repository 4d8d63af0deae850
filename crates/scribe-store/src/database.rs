//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// File name of the local store inside its data directory.
pub const DB_FILE_NAME: &str = "scribe-local.db";

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default local store.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/scribe/scribe-local.db`
    /// - macOS:   `~/Library/Application Support/com.scribe.scribe/scribe-local.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\scribe\scribe\data\scribe-local.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "scribe", "scribe").ok_or(StoreError::NoDataDir)?;

        Self::open_in_dir(project_dirs.data_dir())
    }

    /// Open (or create) the local store inside `dir`, creating the directory
    /// when missing.
    pub fn open_in_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE_NAME);

        tracing::info!(path = %db_path.display(), "opening local store");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_dir_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");

        let db = Database::open_in_dir(&nested).expect("should open");
        assert!(db.path().is_some());
        assert!(nested.join(DB_FILE_NAME).exists());
    }
}
