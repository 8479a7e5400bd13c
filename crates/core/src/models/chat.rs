//! Chat message model
//!
//! Chat is transient: messages are colored and broadcast, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author color palette, indexed by [`author_color`]
pub const AUTHOR_PALETTE: [&str; 6] = [
    "#ffb3ba", "#ffd2b3", "#fff8b3", "#baffb3", "#bae1ff", "#e8baff",
];

/// Deterministic color for an author name.
///
/// Sums the UTF-16 code units of the first three characters and picks
/// `sum % 6` from the palette. Shorter names sum what they have.
pub fn author_color(author_name: &str) -> &'static str {
    let sum: u32 = author_name.encode_utf16().take(3).map(u32::from).sum();
    AUTHOR_PALETTE[(sum as usize) % AUTHOR_PALETTE.len()]
}

/// A chat message as sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChat {
    pub body: String,
    pub author_name: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A chat message as broadcast to the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub body: String,
    pub author_name: String,
    pub color: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Color the message and stamp it with `received_at` if the client did not
    pub fn from_outgoing(msg: OutgoingChat, received_at: DateTime<Utc>) -> Self {
        Self {
            color: author_color(&msg.author_name).to_string(),
            timestamp: msg.timestamp.unwrap_or(received_at),
            body: msg.body,
            author_name: msg.author_name,
        }
    }
}
