//! Combatant state

use pokeduel_protocol::{BaseStats, CombatantData};

use super::moves::Move;
use super::pokemon_type::Type;
use crate::BattleError;

pub const MAX_TYPES: usize = 2;
pub const MAX_MOVES: usize = 4;

/// A team member during battle.
///
/// Only HP changes once the battle starts. `current_hp` is kept private so
/// that it can never exceed `max_hp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    pub id: u32,
    pub name: String,
    pub sprite: String,
    pub types: Vec<Type>,
    pub stats: BaseStats,
    pub moves: Vec<Move>,
    current_hp: u32,
    max_hp: u32,
}

impl Combatant {
    /// Create a combatant at full health
    pub fn new(
        id: u32,
        name: impl Into<String>,
        types: Vec<Type>,
        stats: BaseStats,
        moves: Vec<Move>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sprite: String::new(),
            types,
            stats,
            moves,
            current_hp: stats.hp,
            max_hp: stats.hp,
        }
    }

    /// Validate a combatant read from the document
    pub fn from_protocol(data: &CombatantData) -> Result<Self, BattleError> {
        let invalid = |reason| BattleError::InvalidCombatant {
            name: data.name.clone(),
            reason,
        };

        if data.types.is_empty() || data.types.len() > MAX_TYPES {
            return Err(invalid("needs one or two types"));
        }
        if data.moves.is_empty() || data.moves.len() > MAX_MOVES {
            return Err(invalid("needs one to four moves"));
        }
        if data.max_hp == 0 {
            return Err(invalid("max HP must be positive"));
        }

        let types = data
            .types
            .iter()
            .map(|t| Type::from_protocol(t).ok_or_else(|| BattleError::UnknownType(t.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let moves = data
            .moves
            .iter()
            .map(Move::from_protocol)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: data.id,
            name: data.name.clone(),
            sprite: data.sprite.clone(),
            types,
            stats: data.stats,
            moves,
            current_hp: data.current_hp.min(data.max_hp),
            max_hp: data.max_hp,
        })
    }

    pub fn to_protocol(&self) -> CombatantData {
        CombatantData {
            id: self.id,
            name: self.name.clone(),
            sprite: self.sprite.clone(),
            types: self.types.iter().map(|t| t.as_protocol().to_string()).collect(),
            stats: self.stats,
            moves: self.moves.iter().map(Move::to_protocol).collect(),
            current_hp: self.current_hp,
            max_hp: self.max_hp,
        }
    }

    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_fainted()
    }

    /// HP as a percentage (0-100)
    pub fn hp_percent(&self) -> u32 {
        (self.current_hp * 100) / self.max_hp.max(1)
    }

    /// Subtract damage, clamping at zero. Returns the remaining HP.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.current_hp = self.current_hp.saturating_sub(damage);
        self.current_hp
    }

    /// Lower HP to `hp` if that is below the current value. HP never rises.
    pub fn lower_hp_to(&mut self, hp: u32) {
        self.current_hp = self.current_hp.min(hp);
    }
}
