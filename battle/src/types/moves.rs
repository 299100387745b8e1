//! Moves

use pokeduel_protocol::MoveData;

use super::pokemon_type::Type;
use crate::BattleError;

/// A damaging move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub name: String,
    pub move_type: Type,
    /// Always positive
    pub power: u32,
}

impl Move {
    pub fn new(name: impl Into<String>, move_type: Type, power: u32) -> Self {
        Self {
            name: name.into(),
            move_type,
            power,
        }
    }

    /// Validate a move read from the document
    pub fn from_protocol(data: &MoveData) -> Result<Self, BattleError> {
        let move_type = Type::from_protocol(&data.move_type)
            .ok_or_else(|| BattleError::UnknownType(data.move_type.clone()))?;

        if data.power == 0 {
            return Err(BattleError::InvalidMove {
                name: data.name.clone(),
                reason: "power must be positive",
            });
        }

        Ok(Self::new(data.name.clone(), move_type, data.power))
    }

    pub fn to_protocol(&self) -> MoveData {
        MoveData {
            name: self.name.clone(),
            move_type: self.move_type.as_protocol().to_string(),
            power: self.power,
        }
    }
}
