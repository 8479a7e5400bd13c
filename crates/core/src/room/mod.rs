//! Room coordination: the actor that owns participants, playlist mutations
//! and playback sync for the single shared room.

mod coordinator;
mod notice;
mod transport;
mod worker;

pub use coordinator::{RoomCoordinator, RoomHandle};
pub use notice::{ErrorPayload, RoomNotice, RoomRequest, RoomSnapshot};
pub use transport::Transport;
