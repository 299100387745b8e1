//! Domain types for battle state

mod combatant;
mod moves;
mod pokemon_type;
mod team;

pub use combatant::{Combatant, MAX_MOVES, MAX_TYPES};
pub use moves::Move;
pub use pokemon_type::Type;
pub use team::Team;
