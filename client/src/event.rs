use std::time::Duration;

use pokeduel_battle::{Exchange, Outcome};
use pokeduel_protocol::PlayerRole;

/// Everything a front end needs to render a battle as it unfolds
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    Started {
        me: PlayerRole,
        turn: PlayerRole,
    },
    /// Turn ownership changed; `mine` opens our move window
    TurnStarted { mine: bool },
    /// Time left in our move window
    TimerTick { remaining: Duration },
    /// The move window ran out and a move was picked for us
    AutoMove { move_index: usize },
    MoveResolved(Exchange),
    /// A fainted combatant was replaced
    Substituted { side: PlayerRole, index: usize },
    OpponentOffline { grace: Duration },
    GraceTick { remaining: Duration },
    OpponentBack,
    /// Something was rejected or failed without ending the battle
    Diagnostic(String),
    Ended(Outcome),
}
