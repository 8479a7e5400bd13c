//! Playlist and cursor storage

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::{index_from_i64, parse_datetime, parse_datetime_opt, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{PlaybackCursor, PlaylistEntry};

/// Playlist store
pub struct PlaylistStore<'a> {
    conn: &'a Connection,
}

impl<'a> PlaylistStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// List entries in insertion order
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<PlaylistEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, title, creator, description, added_at
             FROM playlist_entries ORDER BY position",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(PlaylistEntry {
                    source_id: row.get(0)?,
                    title: row.get(1)?,
                    creator: row.get(2)?,
                    description: row.get(3)?,
                    added_at: parse_datetime(&row.get::<_, String>(4)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Number of entries
    pub fn len(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM playlist_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Check whether a source id is already queued
    pub fn contains(&self, source_id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM playlist_entries WHERE source_id = ?1",
                params![source_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Append an entry at the end
    #[instrument(skip(self, entry), fields(source_id = %entry.source_id))]
    pub fn append(&self, entry: &PlaylistEntry) -> Result<()> {
        if self.contains(&entry.source_id)? {
            return Err(Error::InvalidRequest(format!(
                "{} is already in the playlist",
                entry.source_id
            )));
        }

        self.conn.execute(
            "INSERT INTO playlist_entries (source_id, title, creator, description, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.source_id,
                entry.title,
                entry.creator,
                entry.description,
                entry.added_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove an entry, returning the 0-based position it held
    #[instrument(skip(self))]
    pub fn remove(&self, source_id: &str) -> Result<Option<usize>> {
        let row_position: Option<i64> = self
            .conn
            .query_row(
                "SELECT position FROM playlist_entries WHERE source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(row_position) = row_position else {
            return Ok(None);
        };

        let preceding: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM playlist_entries WHERE position < ?1",
            params![row_position],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "DELETE FROM playlist_entries WHERE position = ?1",
            params![row_position],
        )?;

        Ok(Some(preceding as usize))
    }

    /// Read the cursor row
    #[instrument(skip(self))]
    pub fn cursor(&self) -> Result<PlaybackCursor> {
        let cursor = self
            .conn
            .query_row(
                "SELECT current_index, start_time FROM room_cursor WHERE id = 1",
                [],
                |row| {
                    Ok(PlaybackCursor {
                        index: index_from_i64(row.get::<_, Option<i64>>(0)?)?,
                        started_at: parse_datetime_opt(row.get::<_, Option<String>>(1)?)?,
                    })
                },
            )
            .optional()?;

        Ok(cursor.unwrap_or_default())
    }

    /// Point the cursor at an index; clearing it also clears the start time
    #[instrument(skip(self))]
    pub fn set_index(&self, index: Option<usize>) -> Result<()> {
        match index {
            Some(index) => self.conn.execute(
                "UPDATE room_cursor SET current_index = ?1 WHERE id = 1",
                params![index as i64],
            )?,
            None => self.conn.execute(
                "UPDATE room_cursor SET current_index = NULL, start_time = NULL WHERE id = 1",
                [],
            )?,
        };
        Ok(())
    }

    /// Record when the current entry started
    #[instrument(skip(self))]
    pub fn set_start_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE room_cursor SET start_time = ?1 WHERE id = 1",
            params![at.to_rfc3339()],
        )?;
        Ok(())
    }
}
