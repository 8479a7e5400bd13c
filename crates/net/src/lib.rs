//! Famly Network Library
//!
//! Provides the TCP event channel for a watch-party room.
//!
//! # Architecture
//!
//! - **Server**: Accepts participants and feeds their requests to the room
//! - **Client**: Joins a room and tracks host status, playlist and cursor
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let peers = PeerTable::new();
//! let room = RoomCoordinator::spawn(Database::open(path)?, peers.clone());
//! let server = Server::start(addr, room, peers).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! while let Some(notice) = client.next_event().await {
//!     match notice {
//!         RoomNotice::PlayNext(index) => { /* seek */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, ConnectionState};
pub use error::{Error, Result};
pub use protocol::Message;
pub use server::{PeerTable, Server};

/// Default port for the room event channel
pub const DEFAULT_PORT: u16 = 7331;
