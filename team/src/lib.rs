//! Team selection for pokeduel.
//!
//! Candidates come from a [`Catalog`], an external collaborator that maps a
//! species id to a [`CombatantData`](pokeduel_protocol::CombatantData). The
//! [`TeamBuilder`] enforces the selection rules and produces a battle-ready
//! roster.

mod builder;
mod catalog;

pub use builder::{TEAM_SIZE, TeamBuilder, TeamError, prepare_for_battle};
pub use catalog::{
    CANDIDATE_COUNT, Catalog, CatalogError, MAX_SPECIES_ID, StaticCatalog, load_candidates,
    random_candidate_ids,
};
