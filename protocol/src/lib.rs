//! Shared-document schema for pokeduel rooms.
//!
//! Both peers read and write the same document, so field names and value
//! types here are the contract they agree on byte-for-byte.

use thiserror::Error;

pub mod path;
pub mod role;
pub mod room;

pub use path::{CONNECTED_PATH, DocPath, SlotField};
pub use role::PlayerRole;
pub use room::{
    BaseStats, CombatantData, MoveData, MoveSubmission, PlayerSlot, Room, RoomCode,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid room code: {0:?} (expected 6 digits)")]
    InvalidRoomCode(String),

    #[error("Unknown player role: {0}")]
    UnknownRole(String),
}
