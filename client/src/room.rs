use pokeduel_protocol::{DocPath, PlayerRole, Room, RoomCode};
use serde_json::Value;

use crate::store::{self, DocumentStore, Subscription};
use crate::DuelError;

/// Room-level fields shared by both seats.
///
/// Only the fields that either player may write live here. Per-seat fields
/// go through [`OwnSlot`](crate::OwnSlot).
#[derive(Debug, Clone)]
pub struct SharedRoom<S> {
    store: S,
    code: RoomCode,
}

impl<S: DocumentStore> SharedRoom<S> {
    pub fn new(store: S, code: RoomCode) -> Self {
        Self { store, code }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn path(&self) -> DocPath {
        DocPath::room(&self.code)
    }

    pub async fn exists(&self) -> Result<bool, DuelError> {
        Ok(self.store.read(&self.path()).await?.is_some())
    }

    pub async fn read(&self) -> Result<Option<Room>, DuelError> {
        store::read_json(&self.store, &self.path()).await
    }

    pub(crate) async fn create(&self, room: &Room) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.path(), room).await
    }

    pub async fn subscribe(&self) -> Result<Subscription, DuelError> {
        Ok(self.store.subscribe(&self.path()).await?)
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) {
        if let Err(e) = self.store.unsubscribe(subscription.id()).await {
            tracing::debug!(room = %self.code, error = %e, "Unsubscribe failed");
        }
    }

    /// Decode one subscription delivery. `None` means the room is gone.
    pub fn decode(&self, value: Option<Value>) -> Result<Option<Room>, DuelError> {
        value.map(|v| store::decode(&self.path(), v)).transpose()
    }

    /// Mark the battle started with `first_mover` holding the turn.
    ///
    /// Both seats may call this; they write the same values.
    pub(crate) async fn initialize_battle(&self, first_mover: PlayerRole) -> Result<(), DuelError> {
        store::write_json(&self.store, &DocPath::current_turn(&self.code), &first_mover).await?;
        store::write_json(&self.store, &DocPath::game_started(&self.code), &true).await
    }

    /// Hand the turn to `next`. Only the player who just attacked does this.
    pub(crate) async fn pass_turn(&self, next: PlayerRole) -> Result<(), DuelError> {
        store::write_json(&self.store, &DocPath::current_turn(&self.code), &next).await
    }

    pub(crate) async fn remove(&self) -> Result<(), DuelError> {
        self.store.write(&self.path(), None).await?;
        tracing::info!(room = %self.code, "Room removed");
        Ok(())
    }
}
