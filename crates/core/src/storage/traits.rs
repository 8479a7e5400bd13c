//! Storage repository traits
//!
//! These traits define the playlist store interface, allowing for
//! different implementations (SQLite, mock, future network backend).

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{PlaybackCursor, PlaylistEntry};

/// Durable ordered playlist plus the room's playback cursor
///
/// Implementations are owned by a single store worker, so they only need
/// to be `Send`.
pub trait PlaylistRepository: Send + 'static {
    /// All entries in insertion order
    fn list_entries(&self) -> Result<Vec<PlaylistEntry>>;

    /// Append an entry. Fails with `InvalidRequest` if its source id is
    /// already in the playlist.
    fn append_entry(&self, entry: &PlaylistEntry) -> Result<()>;

    /// Remove the entry with this source id. Returns the position it
    /// occupied, or `None` if no such entry exists.
    fn remove_entry(&self, source_id: &str) -> Result<Option<usize>>;

    /// Current cursor
    fn cursor(&self) -> Result<PlaybackCursor>;

    /// Point the cursor at `index`. `None` also clears the start time.
    fn set_cursor(&self, index: Option<usize>) -> Result<()>;

    /// Point the cursor back at the first entry
    fn reset_cursor(&self) -> Result<()> {
        self.set_cursor(Some(0))
    }

    /// Record when the current entry started playing
    fn set_start_time(&self, at: DateTime<Utc>) -> Result<()>;

    /// Run `f` so that either all of its writes land or none do.
    ///
    /// The default runs `f` directly; transactional stores override it.
    fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T>,
    {
        f(self)
    }
}
