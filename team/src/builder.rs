use std::collections::HashSet;

use pokeduel_protocol::CombatantData;
use thiserror::Error;

/// Members per battle team
pub const TEAM_SIZE: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TeamError {
    #[error("Team must have exactly {expected} members, got {got}")]
    InvalidTeamSize { expected: usize, got: usize },

    #[error("Combatant {0} appears more than once")]
    DuplicateCombatant(u32),

    #[error("Team already has {0} members")]
    TeamFull(usize),
}

/// Selection state while a player assembles their team.
///
/// Picking an already selected combatant deselects it. Order of selection is
/// the party order.
#[derive(Debug, Clone)]
pub struct TeamBuilder {
    size: usize,
    selected: Vec<CombatantData>,
}

impl Default for TeamBuilder {
    fn default() -> Self {
        Self::new(TEAM_SIZE)
    }
}

impl TeamBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            selected: Vec::with_capacity(size),
        }
    }

    /// Select or deselect `combatant`. Returns whether it is now selected.
    pub fn toggle(&mut self, combatant: CombatantData) -> Result<bool, TeamError> {
        if self.deselect(combatant.id) {
            return Ok(false);
        }
        self.select(combatant)?;
        Ok(true)
    }

    pub fn select(&mut self, combatant: CombatantData) -> Result<(), TeamError> {
        if self.is_selected(combatant.id) {
            return Err(TeamError::DuplicateCombatant(combatant.id));
        }
        if self.is_full() {
            return Err(TeamError::TeamFull(self.size));
        }
        self.selected.push(combatant);
        Ok(())
    }

    pub fn deselect(&mut self, id: u32) -> bool {
        let before = self.selected.len();
        self.selected.retain(|c| c.id != id);
        self.selected.len() != before
    }

    pub fn is_selected(&self, id: u32) -> bool {
        self.selected.iter().any(|c| c.id == id)
    }

    pub fn selected(&self) -> &[CombatantData] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.size
    }

    /// Whether the team can be confirmed
    pub fn is_complete(&self) -> bool {
        self.selected.len() == self.size
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Finish selection and return the battle-ready roster
    pub fn build(self) -> Result<Vec<CombatantData>, TeamError> {
        prepare_for_battle(self.selected, self.size)
    }
}

/// Validate a roster and reset every member to full HP.
///
/// `currentHp` and `maxHp` both become the base `hp` stat.
pub fn prepare_for_battle(
    team: Vec<CombatantData>,
    size: usize,
) -> Result<Vec<CombatantData>, TeamError> {
    if team.len() != size {
        return Err(TeamError::InvalidTeamSize {
            expected: size,
            got: team.len(),
        });
    }

    let mut ids = HashSet::with_capacity(team.len());
    for combatant in &team {
        if !ids.insert(combatant.id) {
            return Err(TeamError::DuplicateCombatant(combatant.id));
        }
    }

    Ok(team
        .into_iter()
        .map(|mut combatant| {
            combatant.max_hp = combatant.stats.hp;
            combatant.current_hp = combatant.stats.hp;
            combatant
        })
        .collect())
}
