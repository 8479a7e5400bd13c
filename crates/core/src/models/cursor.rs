//! Playback cursor: what is playing and since when

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current playlist index and the moment that entry started playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackCursor {
    /// `None` iff the playlist is empty
    pub index: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
}

impl PlaybackCursor {
    pub fn at(index: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            index: Some(index),
            started_at: Some(started_at),
        }
    }

    /// Milliseconds since the current entry started, never negative
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|start| (now - start).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Whether the cursor points inside a playlist of `len` entries
    pub fn is_valid_for(&self, len: usize) -> bool {
        match self.index {
            Some(index) => index < len,
            None => len == 0,
        }
    }
}

/// Index to play after `current`.
///
/// Wraps to 0 when the caller saw the cursor on the last entry
/// (`observed_len == current + 1`). A plain increment that would run past
/// the real playlist also wraps. Returns `None` for an empty playlist.
pub fn next_index(current: Option<usize>, observed_len: usize, actual_len: usize) -> Option<usize> {
    if actual_len == 0 {
        return None;
    }

    let Some(current) = current else {
        return Some(0);
    };

    if observed_len == current + 1 {
        return Some(0);
    }

    let next = current + 1;
    if next >= actual_len {
        Some(0)
    } else {
        Some(next)
    }
}

/// Where the cursor should point after removing the entry at `removed`
/// from a playlist that now holds `remaining` entries.
///
/// Removing the playing entry parks the cursor on its predecessor, so the
/// host's next advance lands on the entry that followed it.
pub fn index_after_removal(current: Option<usize>, removed: usize, remaining: usize) -> Option<usize> {
    if remaining == 0 {
        return None;
    }

    let current = current?;
    let index = if removed < current {
        current - 1
    } else if removed == current {
        (current + remaining - 1) % remaining
    } else {
        current
    };

    Some(index.min(remaining - 1))
}
