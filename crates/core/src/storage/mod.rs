//! SQLite storage layer for famly

mod migrations;
mod parse;
mod playlist;
mod traits;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::models::{PlaybackCursor, PlaylistEntry};

pub use playlist::PlaylistStore;
pub use traits::PlaylistRepository;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        migrations::current_version(&self.conn).unwrap_or(0)
    }

    /// Get playlist store
    pub fn playlist(&self) -> PlaylistStore<'_> {
        PlaylistStore::new(&self.conn)
    }
}

impl PlaylistRepository for Database {
    fn list_entries(&self) -> Result<Vec<PlaylistEntry>> {
        self.playlist().list()
    }

    fn append_entry(&self, entry: &PlaylistEntry) -> Result<()> {
        self.playlist().append(entry)
    }

    fn remove_entry(&self, source_id: &str) -> Result<Option<usize>> {
        self.playlist().remove(source_id)
    }

    fn cursor(&self) -> Result<PlaybackCursor> {
        self.playlist().cursor()
    }

    fn set_cursor(&self, index: Option<usize>) -> Result<()> {
        self.playlist().set_index(index)
    }

    fn set_start_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.playlist().set_start_time(at)
    }

    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    fn entry(source_id: &str) -> PlaylistEntry {
        PlaylistEntry {
            title: format!("Video {}", source_id),
            creator: "Someone".into(),
            source_id: source_id.into(),
            description: String::new(),
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_schema_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version(), 1);
    }

    #[test]
    fn test_append_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            db.append_entry(&entry(id)).unwrap();
        }

        let ids: Vec<_> = db
            .list_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.source_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_append_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.append_entry(&entry("a")).unwrap();

        let result = db.append_entry(&entry("a"));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(db.playlist().len().unwrap(), 1);
    }

    #[test]
    fn test_remove_reports_position() {
        let db = Database::open_in_memory().unwrap();
        for id in ["a", "b", "c"] {
            db.append_entry(&entry(id)).unwrap();
        }

        assert_eq!(db.remove_entry("b").unwrap(), Some(1));
        assert_eq!(db.remove_entry("c").unwrap(), Some(1));
        assert_eq!(db.remove_entry("missing").unwrap(), None);
        assert_eq!(db.playlist().len().unwrap(), 1);
    }

    #[test]
    fn test_fresh_cursor_is_empty() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.cursor().unwrap(), PlaybackCursor::default());
    }

    #[test]
    fn test_cursor_updates() {
        let db = Database::open_in_memory().unwrap();
        let start = Utc::now();

        db.reset_cursor().unwrap();
        db.set_start_time(start).unwrap();
        assert_eq!(db.cursor().unwrap(), PlaybackCursor::at(0, start));

        db.set_cursor(Some(3)).unwrap();
        assert_eq!(db.cursor().unwrap().index, Some(3));

        db.set_cursor(None).unwrap();
        assert_eq!(db.cursor().unwrap(), PlaybackCursor::default());
    }

    #[test]
    fn test_atomically_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.atomically(|db| {
            db.append_entry(&entry("a"))?;
            db.reset_cursor()?;
            Err(Error::Adapter("simulated".into()))
        });

        assert!(result.is_err());
        assert!(db.playlist().is_empty().unwrap());
        assert_eq!(db.cursor().unwrap().index, None);
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("famly.db");
        let start = Utc::now();

        {
            let db = Database::open(&path).unwrap();
            db.append_entry(&entry("a")).unwrap();
            db.reset_cursor().unwrap();
            db.set_start_time(start).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_entries().unwrap().len(), 1);
        assert_eq!(db.cursor().unwrap(), PlaybackCursor::at(0, start));
    }
}
