use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Which of the two room slots a client owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRole {
    #[serde(rename = "player1")]
    Player1,
    #[serde(rename = "player2")]
    Player2,
}

impl PlayerRole {
    /// The role that creates the room and moves first
    pub const HOST: PlayerRole = PlayerRole::Player1;

    pub fn opponent(self) -> Self {
        match self {
            PlayerRole::Player1 => PlayerRole::Player2,
            PlayerRole::Player2 => PlayerRole::Player1,
        }
    }

    /// Key of this role's slot inside the room document
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerRole::Player1 => "player1",
            PlayerRole::Player2 => "player2",
        }
    }

    pub fn from_protocol(s: &str) -> Result<Self, SchemaError> {
        match s {
            "player1" => Ok(PlayerRole::Player1),
            "player2" => Ok(PlayerRole::Player2),
            other => Err(SchemaError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
