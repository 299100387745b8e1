//! The turn state machine

mod phase;
mod state;
mod turn;

pub use phase::{Exchange, Outcome, Phase, Substitution};
pub use state::Duel;
