//! famly Core Library
//!
//! Models, host election, playlist storage and the room coordinator for a
//! shared watch-party room.

pub mod error;
pub mod hosting;
pub mod invariants;
pub mod lookup;
pub mod models;
pub mod room;
pub mod storage;

pub use error::{Error, ErrorKind, Result};
pub use hosting::{ConnectOutcome, SessionRegistry};
pub use lookup::{DisabledLookup, StaticLookup, VideoLookup};
pub use models::*;
pub use room::{
    ErrorPayload, RoomCoordinator, RoomHandle, RoomNotice, RoomRequest, RoomSnapshot, Transport,
};
pub use storage::{Database, PlaylistRepository, PlaylistStore};
