use pokeduel_protocol::PlayerRole;

use crate::damage::Resolution;
use crate::types::Move;

/// How a battle ended, from the local player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Won,
    Lost,
    OpponentDisconnected,
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Picking combatants
    TeamSelection,
    /// Own team submitted, waiting for the other seat
    AwaitingBothReady,
    /// Turns alternating
    InProgress,
    Terminal(Outcome),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Terminal(_))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Phase::Terminal(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

/// A forced replacement after a faint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    /// Whose team the replacement came from
    pub side: PlayerRole,
    /// Party index now on the field
    pub index: usize,
}

/// Everything that happened when one move was resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub attacker: PlayerRole,
    pub attacker_name: String,
    pub defender_name: String,
    pub move_used: Move,
    pub resolution: Resolution,
    pub substitution: Option<Substitution>,
    /// Set only on the attacking client, which alone hands the turn over
    pub pass_turn_to: Option<PlayerRole>,
    pub outcome: Option<Outcome>,
}
