//! Combat resolution.
//!
//! Both peers run these functions independently on the same inputs and must
//! land on the same numbers, so nothing here is random and the floating point
//! operations happen in a fixed order.

use crate::types::{Combatant, Move, Type};

/// Effectiveness of a move type against a defender, compounded over all of
/// the defender's types
pub fn effectiveness(move_type: Type, defender_types: &[Type]) -> f64 {
    move_type.effectiveness_multi(defender_types)
}

/// `floor(power * (attack / defense) * effectiveness / 5)`.
///
/// A defense of zero is treated as one.
pub fn calculate_damage(power: u32, attack: u32, defense: u32, effectiveness: f64) -> u32 {
    let defense = defense.max(1);
    let raw = (f64::from(power) * (f64::from(attack) / f64::from(defense)) * effectiveness) / 5.0;
    raw.floor().max(0.0) as u32
}

/// Outcome of one move hitting one defender
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub damage: u32,
    pub effectiveness: f64,
    pub defender_hp: u32,
    pub fainted: bool,
}

/// Apply `mv` from `attacker` to `defender`
pub fn resolve(attacker: &Combatant, defender: &mut Combatant, mv: &Move) -> Resolution {
    let effectiveness = effectiveness(mv.move_type, &defender.types);
    let damage = calculate_damage(
        mv.power,
        attacker.stats.attack,
        defender.stats.defense,
        effectiveness,
    );
    let defender_hp = defender.take_damage(damage);

    Resolution {
        damage,
        effectiveness,
        defender_hp,
        fainted: defender.is_fainted(),
    }
}
