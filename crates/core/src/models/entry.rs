//! Playlist entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A candidate video, as submitted by clients or returned by a lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub title: String,
    pub creator: String,
    /// Opaque reference to playable media (a YouTube video id in practice)
    pub source_id: String,
    #[serde(default)]
    pub description: String,
}

impl VideoDescriptor {
    /// Turn a descriptor into a playlist entry stamped with `added_at`
    pub fn into_entry(self, added_at: DateTime<Utc>) -> Result<PlaylistEntry> {
        let source_id = self.source_id.trim().to_string();
        if source_id.is_empty() {
            return Err(Error::InvalidRequest("video has no source id".into()));
        }

        Ok(PlaylistEntry {
            title: self.title,
            creator: self.creator,
            source_id,
            description: self.description,
            added_at,
        })
    }
}

/// An entry in the shared playlist. Identified by `source_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub title: String,
    pub creator: String,
    pub source_id: String,
    pub description: String,
    pub added_at: DateTime<Utc>,
}
