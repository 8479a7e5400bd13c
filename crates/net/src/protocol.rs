//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. Room
//! traffic is wrapped so the frame layer can carry keep-alives alongside.

use famly_core::{RoomNotice, RoomRequest};
use serde::{Deserialize, Serialize};

/// Network protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    /// Client request for the room
    Request(RoomRequest),

    /// Room notification for the client
    Notice(RoomNotice),

    /// Server refused the connection
    Rejected { reason: String },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
