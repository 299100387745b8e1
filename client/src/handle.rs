use std::sync::{Arc, RwLock};

use pokeduel_battle::{Duel, Phase};
use tokio::sync::mpsc;

use crate::DuelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    ChooseMove(usize),
}

/// Cloneable handle for steering a running [`Battle`](crate::Battle)
#[derive(Debug, Clone)]
pub struct BattleHandle {
    tx: mpsc::UnboundedSender<Command>,
    duel: Arc<RwLock<Duel>>,
}

impl BattleHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>, duel: Arc<RwLock<Duel>>) -> Self {
        Self { tx, duel }
    }

    fn send(&self, command: Command) -> Result<(), DuelError> {
        self.tx.send(command).map_err(|_| DuelError::LoopClosed)
    }

    /// Attack with the active combatant's move at `index`.
    ///
    /// Ignored with a diagnostic event when it is not our turn.
    pub fn choose_move(&self, index: usize) -> Result<(), DuelError> {
        self.send(Command::ChooseMove(index))
    }

    /// Snapshot of the battle as last seen by the loop
    pub fn duel(&self) -> Option<Duel> {
        self.duel.read().ok().map(|d| d.clone())
    }

    pub fn phase(&self) -> Option<Phase> {
        self.duel.read().ok().map(|d| d.phase())
    }

    pub fn is_my_turn(&self) -> bool {
        self.duel.read().map(|d| d.is_my_turn()).unwrap_or(false)
    }
}
