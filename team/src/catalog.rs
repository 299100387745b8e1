use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use pokeduel_protocol::CombatantData;
use rand::Rng;
use thiserror::Error;

/// How many candidates a selection screen offers
pub const CANDIDATE_COUNT: usize = 30;

/// Highest species id candidates are drawn from
pub const MAX_SPECIES_ID: u32 = 151;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog entry {id} unavailable: {reason}")]
    Unavailable { id: u32, reason: String },
}

/// Source of combatant records by species id.
///
/// Implementations talk to whatever backs the catalog (a web API, a bundled
/// file). Records come back at full HP.
pub trait Catalog: Send + Sync {
    fn fetch(&self, id: u32) -> impl Future<Output = Result<CombatantData, CatalogError>> + Send;
}

/// A catalog held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<u32, CombatantData>,
}

impl StaticCatalog {
    pub fn new(entries: impl IntoIterator<Item = CombatantData>) -> Self {
        Self {
            entries: entries.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Load from a JSON array of combatant records
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<CombatantData> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn insert(&mut self, combatant: CombatantData) {
        self.entries.insert(combatant.id, combatant);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for StaticCatalog {
    async fn fetch(&self, id: u32) -> Result<CombatantData, CatalogError> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::Unavailable {
                id,
                reason: "not in catalog".into(),
            })
    }
}

/// Draw [`CANDIDATE_COUNT`] distinct species ids from `1..=MAX_SPECIES_ID`
pub fn random_candidate_ids<R: Rng>(rng: &mut R) -> Vec<u32> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(CANDIDATE_COUNT);
    while ids.len() < CANDIDATE_COUNT {
        let id = rng.gen_range(1..=MAX_SPECIES_ID);
        if seen.insert(id) {
            ids.push(id);
        }
    }
    ids
}

/// Fetch every id in order, skipping the ones the catalog cannot supply
pub async fn load_candidates<C: Catalog>(catalog: &C, ids: &[u32]) -> Vec<CombatantData> {
    let mut candidates = Vec::with_capacity(ids.len());
    for &id in ids {
        match catalog.fetch(id).await {
            Ok(combatant) => candidates.push(combatant),
            Err(e) => {
                tracing::warn!(id, error = %e, "Skipping unavailable candidate");
            }
        }
    }
    candidates
}
