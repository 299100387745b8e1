//! Deterministic combat and turn tracking for pokeduel battles.
//!
//! There is no server deciding outcomes. Each of the two clients runs this
//! crate on the same inputs and reaches the same result on its own.
//!
//! # Overview
//!
//! ```text
//! pokeduel-protocol (document schema)
//!        │
//!        ▼
//! pokeduel-battle (domain types + resolution + turn machine) ← THIS CRATE
//!        │
//!        └─> pokeduel-client (store sync, timers, presence)
//! ```
//!
//! # Main Types
//!
//! - [`Type`] - elemental types with the effectiveness chart
//! - [`Combatant`], [`Move`], [`Team`] - validated views of document records
//! - [`damage`] - the pure resolver
//! - [`Duel`] - one player's view of a running battle; see [`Duel::prepare_attack`],
//!   [`Duel::commit_attack`] and [`Duel::observe_opponent_move`]
//!
//! # Example Usage
//!
//! ```ignore
//! use pokeduel_battle::Duel;
//! use pokeduel_protocol::PlayerRole;
//!
//! let mut duel = Duel::start(PlayerRole::Player1, PlayerRole::Player1, &mine, &theirs)?;
//! let submission = duel.prepare_attack(0)?;
//! // publish `submission` to our slot, then:
//! let exchange = duel.commit_attack(&submission)?;
//! if let Some(next) = exchange.pass_turn_to {
//!     // publish `next` as the room's currentTurn
//! }
//! ```

pub mod damage;
pub mod duel;
mod error;
pub mod types;

pub use damage::Resolution;
pub use duel::{Duel, Exchange, Outcome, Phase, Substitution};
pub use error::BattleError;
pub use types::{Combatant, MAX_MOVES, MAX_TYPES, Move, Team, Type};

// Re-export commonly used protocol types
pub use pokeduel_protocol::{CombatantData, MoveData, MoveSubmission, PlayerRole};
