//! Single-writer access to player seats.
//!
//! Each seat's fields are written only by the player sitting in it. Holding
//! an [`OwnSlot`] is what lets a client write; everything it knows about the
//! other seat comes through a read-only [`OpponentView`].

use pokeduel_protocol::{
    CombatantData, DocPath, MoveSubmission, PlayerRole, PlayerSlot, Room, RoomCode, SlotField,
};

use crate::store::{self, DocumentStore};
use crate::DuelError;

/// Write handle for the caller's own seat
#[derive(Debug, Clone)]
pub struct OwnSlot<S> {
    store: S,
    code: RoomCode,
    role: PlayerRole,
}

impl<S: DocumentStore> OwnSlot<S> {
    pub(crate) fn new(store: S, code: RoomCode, role: PlayerRole) -> Self {
        Self { store, code, role }
    }

    pub fn role(&self) -> PlayerRole {
        self.role
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    fn field(&self, field: SlotField) -> DocPath {
        DocPath::slot_field(&self.code, self.role, field)
    }

    /// Occupy the seat with an empty slot
    pub async fn take_seat(&self) -> Result<(), DuelError> {
        let path = DocPath::slot(&self.code, self.role);
        store::write_json(&self.store, &path, &PlayerSlot::fresh()).await
    }

    pub async fn set_ready(&self, ready: bool) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::Ready), &ready).await
    }

    pub async fn set_team(&self, team: &[CombatantData]) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::Team), team).await
    }

    pub async fn clear_team(&self) -> Result<(), DuelError> {
        self.store.write(&self.field(SlotField::Team), None).await?;
        Ok(())
    }

    pub async fn set_active_index(&self, index: usize) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::ActivePokemonIndex), &index).await
    }

    pub async fn submit_move(&self, submission: &MoveSubmission) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::CurrentMove), submission).await
    }

    /// Record that the opponent's move `seq` has been resolved on our side
    pub async fn set_seen_seq(&self, seq: u32) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::SeenSeq), &seq).await
    }

    pub async fn set_online(&self, online: bool) -> Result<(), DuelError> {
        store::write_json(&self.store, &self.field(SlotField::Online), &online).await
    }

    /// Have the store flip our presence flag off if our link drops
    pub async fn arm_offline_marker(&self) -> Result<(), DuelError> {
        let path = self.field(SlotField::Online);
        self.store
            .on_disconnect(&path, Some(serde_json::Value::Bool(false)))
            .await?;
        Ok(())
    }

    pub async fn cancel_offline_marker(&self) -> Result<(), DuelError> {
        self.store
            .cancel_on_disconnect(&self.field(SlotField::Online))
            .await?;
        Ok(())
    }
}

/// Read-only view of the other seat in one room snapshot
#[derive(Debug, Clone, Copy)]
pub struct OpponentView<'a> {
    role: PlayerRole,
    slot: Option<&'a PlayerSlot>,
}

impl<'a> OpponentView<'a> {
    /// The seat opposite `me` in `room`
    pub fn of(room: &'a Room, me: PlayerRole) -> Self {
        let role = me.opponent();
        Self {
            role,
            slot: room.slot(role),
        }
    }

    pub fn role(&self) -> PlayerRole {
        self.role
    }

    pub fn is_present(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_some_and(|s| s.ready)
    }

    pub fn team(&self) -> Option<&'a [CombatantData]> {
        self.slot.and_then(|s| s.team.as_deref())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.slot.map(|s| s.active_pokemon_index)
    }

    pub fn current_move(&self) -> Option<&'a MoveSubmission> {
        self.slot.and_then(|s| s.current_move.as_ref())
    }

    /// Presence flag, `None` while never registered
    pub fn online(&self) -> Option<bool> {
        self.slot.and_then(|s| s.online)
    }

    pub fn is_offline(&self) -> bool {
        self.slot.is_some_and(PlayerSlot::is_offline)
    }
}

#[cfg(test)]
mod tests {
    use pokeduel_protocol::{BaseStats, MoveData};
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn member(id: u32) -> CombatantData {
        CombatantData {
            id,
            name: format!("m{}", id),
            sprite: String::new(),
            types: vec!["grass".into()],
            stats: BaseStats { hp: 45, attack: 49, defense: 49 },
            moves: vec![MoveData {
                name: "Vine Whip".into(),
                move_type: "grass".into(),
                power: 45,
            }],
            current_hp: 45,
            max_hp: 45,
        }
    }

    #[tokio::test]
    async fn test_own_slot_writes_only_own_seat() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let code = RoomCode::parse("123456").unwrap();
        let slot = OwnSlot::new(conn, code.clone(), PlayerRole::Player2);

        slot.take_seat().await.unwrap();
        slot.set_team(&[member(1), member(2)]).await.unwrap();
        slot.set_ready(true).await.unwrap();
        slot.set_active_index(1).await.unwrap();
        slot.set_online(true).await.unwrap();

        let room = store.peek(&DocPath::room(&code)).unwrap();
        assert!(room.get("player1").is_none());
        assert_eq!(room["player2"]["ready"], json!(true));
        assert_eq!(room["player2"]["activePokemonIndex"], json!(1));
        assert_eq!(room["player2"]["team"].as_array().map(Vec::len), Some(2));

        slot.clear_team().await.unwrap();
        let room = store.peek(&DocPath::room(&code)).unwrap();
        assert!(room["player2"].get("team").is_none());
    }

    #[tokio::test]
    async fn test_offline_marker() {
        let store = MemoryStore::new();
        let conn = store.connect();
        let code = RoomCode::parse("123456").unwrap();
        let slot = OwnSlot::new(conn.clone(), code.clone(), PlayerRole::Player1);
        let online = DocPath::slot_field(&code, PlayerRole::Player1, SlotField::Online);

        slot.set_online(true).await.unwrap();
        slot.arm_offline_marker().await.unwrap();
        conn.disconnect();
        assert_eq!(store.peek(&online), Some(json!(false)));
    }

    #[test]
    fn test_opponent_view() {
        let mut room = Room::open();
        let view = OpponentView::of(&room, PlayerRole::Player1);
        assert_eq!(view.role(), PlayerRole::Player2);
        assert!(!view.is_present());
        assert!(!view.is_offline());
        assert_eq!(view.active_index(), None);

        room.player2 = Some(PlayerSlot {
            ready: true,
            team: Some(vec![member(7)]),
            active_pokemon_index: 0,
            current_move: None,
            seen_seq: None,
            online: Some(false),
        });
        let view = OpponentView::of(&room, PlayerRole::Player1);
        assert!(view.is_ready());
        assert!(view.is_offline());
        assert_eq!(view.team().map(<[_]>::len), Some(1));

        let host_view = OpponentView::of(&room, PlayerRole::Player2);
        assert_eq!(host_view.online(), None);
        assert!(!host_view.is_offline());
    }
}
