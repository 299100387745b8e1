
use serde::{Deserialize, Serialize};

use crate::{PlayerRole, SchemaError};

/// Six-digit numeric room code, shared out of band between the two players
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    /// Parse a user-entered code (surrounding whitespace is ignored)
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let trimmed = s.trim();
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SchemaError::InvalidRoomCode(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_number(n: u32) -> Result<Self, SchemaError> {
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(SchemaError::InvalidRoomCode(n.to_string()));
        }
        Ok(Self(n.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base stats as delivered by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
}

/// A move as stored in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveData {
    pub name: String,
    #[serde(rename = "type")]
    pub move_type: String,
    pub power: u32,
}

/// The last move a player submitted.
///
/// `seq` grows with every submission from the same slot. The store only
/// notifies on value change, so without it a repeated move would go unseen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSubmission {
    #[serde(flatten)]
    pub data: MoveData,
    #[serde(default)]
    pub seq: u32,
}

/// One team member as stored in the owner's slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantData {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
    pub types: Vec<String>,
    pub stats: BaseStats,
    pub moves: Vec<MoveData>,
    pub current_hp: u32,
    pub max_hp: u32,
}

impl CombatantData {
    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }
}

/// The part of a room owned by a single player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    #[serde(default)]
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Vec<CombatantData>>,

    #[serde(default)]
    pub active_pokemon_index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_move: Option<MoveSubmission>,

    /// `seq` of the latest opponent move this player has resolved and
    /// written its team for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_seq: Option<u32>,

    /// Presence flag. Absent until the owner first registers presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
}

impl PlayerSlot {
    /// Slot as written when a player first takes a seat
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Ready with a complete team of `team_size` members
    pub fn is_ready_with(&self, team_size: usize) -> bool {
        self.ready && self.team.as_ref().is_some_and(|t| t.len() == team_size)
    }

    pub fn is_offline(&self) -> bool {
        self.online == Some(false)
    }
}

/// The shared document for one match, stored at `rooms/{code}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<PlayerRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player1: Option<PlayerSlot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2: Option<PlayerSlot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<PlayerRole>,

    #[serde(default)]
    pub game_started: bool,
}

impl Room {
    /// Room as written by the host at creation: only the host's seat taken,
    /// turn ownership still unset
    pub fn open() -> Self {
        Self {
            host: Some(PlayerRole::HOST),
            player1: Some(PlayerSlot::fresh()),
            player2: None,
            current_turn: None,
            game_started: false,
        }
    }

    pub fn slot(&self, role: PlayerRole) -> Option<&PlayerSlot> {
        match role {
            PlayerRole::Player1 => self.player1.as_ref(),
            PlayerRole::Player2 => self.player2.as_ref(),
        }
    }

    /// Role that moves first once the battle starts
    pub fn first_mover(&self) -> PlayerRole {
        self.host.unwrap_or(PlayerRole::HOST)
    }

    /// Both seats ready, each with exactly `team_size` combatants
    pub fn both_ready(&self, team_size: usize) -> bool {
        [PlayerRole::Player1, PlayerRole::Player2]
            .iter()
            .all(|r| self.slot(*r).is_some_and(|s| s.is_ready_with(team_size)))
    }

    pub fn any_ready(&self) -> bool {
        [PlayerRole::Player1, PlayerRole::Player2]
            .iter()
            .any(|r| self.slot(*r).is_some_and(|s| s.ready))
    }

    pub fn both_teams_present(&self) -> bool {
        [PlayerRole::Player1, PlayerRole::Player2]
            .iter()
            .all(|r| self.slot(*r).is_some_and(|s| s.team.is_some()))
    }
}
