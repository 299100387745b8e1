use pokeduel_protocol::PlayerRole;
use thiserror::Error;

use crate::duel::Phase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BattleError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid move {name:?}: {reason}")]
    InvalidMove { name: String, reason: &'static str },

    #[error("Invalid combatant {name:?}: {reason}")]
    InvalidCombatant { name: String, reason: &'static str },

    #[error("Not {0}'s turn")]
    NotYourTurn(PlayerRole),

    #[error("Opponent {0} does not own the turn")]
    NotOpponentsTurn(PlayerRole),

    #[error("Battle is not in progress (phase: {0:?})")]
    NotInProgress(Phase),

    #[error("Move index {index} out of range ({available} available)")]
    MoveIndexOutOfRange { index: usize, available: usize },

    #[error("Active index {index} is not a conscious team member")]
    InvalidActiveIndex { index: usize },

    #[error("Submission {seq} was prepared for a different turn")]
    StaleSubmission { seq: u32 },
}
