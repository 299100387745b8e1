//! Key paths into the shared document

use crate::{PlayerRole, RoomCode};

/// Reserved path reporting whether the local link to the store is live
pub const CONNECTED_PATH: &str = ".info/connected";

const ROOMS: &str = "rooms";

/// Slash-separated path into the shared document.
///
/// Empty segments are dropped, so `"/rooms//123456/"` and `"rooms/123456"`
/// name the same node. The empty path is the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(String);

impl DocPath {
    pub fn new(path: &str) -> Self {
        let joined = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn connected() -> Self {
        Self(CONNECTED_PATH.to_string())
    }

    pub fn room(code: &RoomCode) -> Self {
        Self(format!("{}/{}", ROOMS, code))
    }

    pub fn slot(code: &RoomCode, role: PlayerRole) -> Self {
        Self::room(code).child(role.as_str())
    }

    pub fn slot_field(code: &RoomCode, role: PlayerRole, field: SlotField) -> Self {
        Self::slot(code, role).child(field.as_str())
    }

    pub fn current_turn(code: &RoomCode) -> Self {
        Self::room(code).child("currentTurn")
    }

    pub fn game_started(code: &RoomCode) -> Self {
        Self::room(code).child("gameStarted")
    }

    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self::new(segment)
        } else {
            Self::new(&format!("{}/{}", self.0, segment))
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths starting with `.` are answered by the store itself, not the document
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with('.')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Fields of a [`PlayerSlot`](crate::PlayerSlot), named as they appear in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotField {
    Ready,
    Team,
    ActivePokemonIndex,
    CurrentMove,
    SeenSeq,
    Online,
}

impl SlotField {
    pub const ALL: [SlotField; 6] = [
        SlotField::Ready,
        SlotField::Team,
        SlotField::ActivePokemonIndex,
        SlotField::CurrentMove,
        SlotField::SeenSeq,
        SlotField::Online,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotField::Ready => "ready",
            SlotField::Team => "team",
            SlotField::ActivePokemonIndex => "activePokemonIndex",
            SlotField::CurrentMove => "currentMove",
            SlotField::SeenSeq => "seenSeq",
            SlotField::Online => "online",
        }
    }
}
