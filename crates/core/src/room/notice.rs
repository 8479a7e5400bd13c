//! Room protocol events
//!
//! Event names follow the room's wire vocabulary (`saveToPlaylist`,
//! `retrievePlaylist`, ...). Each serializes as `{"event": name, "data": payload}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::models::{ChatMessage, OutgoingChat, ParticipantId, PlaylistEntry, VideoDescriptor};

/// Requests a participant can make of the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RoomRequest {
    /// Append a video to the playlist
    SaveToPlaylist(VideoDescriptor),
    /// Remove the entry with this source id
    RemoveFromPlaylist(String),
    /// Send a chat message
    EmitMessage(OutgoingChat),
    /// Advance playback (host only)
    PlayNext {
        #[serde(rename = "observedLength")]
        observed_length: usize,
    },
}

/// Notifications the room sends to participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RoomNotice {
    /// Your session id
    Welcome(ParticipantId),
    /// Live room state for a joining participant
    RoomState(RoomSnapshot),
    /// You are now host
    Host,
    /// The playlist is empty; nothing is playing
    Default,
    /// Full playlist snapshot
    RetrievePlaylist(Vec<PlaylistEntry>),
    /// Cursor moved; seek to offset 0 of this entry
    PlayNext(usize),
    /// A chat message
    PushingMessage(ChatMessage),
    /// A non-fatal failure
    Error(ErrorPayload),
}

/// What a participant needs to join playback at the live position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub videos: Vec<PlaylistEntry>,
    pub index: Option<usize>,
    pub start: Option<DateTime<Utc>>,
    /// Milliseconds into the current entry when the snapshot was taken
    pub elapsed_ms: u64,
}

/// Error details carried by [`RoomNotice::Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ErrorPayload {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
