//! Data models for famly

mod chat;
mod cursor;
mod entry;
mod participant;

pub use chat::*;
pub use cursor::*;
pub use entry::*;
pub use participant::*;
