#![allow(dead_code)]

use std::sync::Arc;

use pokeduel_client::{
    Battle, BattleEvent, DuelConfig, MemoryConnection, MemoryRecordStore, MemoryStore, Session,
};
use pokeduel_protocol::{BaseStats, CombatantData, MoveData};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Normal-type member whose one move deals 10 to any other member
pub fn member(id: u32, hp: u32) -> CombatantData {
    CombatantData {
        id,
        name: format!("mon-{}", id),
        sprite: String::new(),
        types: vec!["normal".into()],
        stats: BaseStats { hp, attack: 50, defense: 50 },
        moves: vec![MoveData {
            name: "Slam".into(),
            move_type: "normal".into(),
            power: 50,
        }],
        current_hp: 0,
        max_hp: 0,
    }
}

/// Four members with 20 HP each
pub fn team(first_id: u32) -> Vec<CombatantData> {
    (first_id..first_id + 4).map(|id| member(id, 20)).collect()
}

pub struct Table {
    pub store: MemoryStore,
    pub host_conn: MemoryConnection,
    pub guest_conn: MemoryConnection,
    pub host_records: Arc<MemoryRecordStore>,
    pub guest_records: Arc<MemoryRecordStore>,
}

impl Table {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Self {
            host_conn: store.connect(),
            guest_conn: store.connect(),
            store,
            host_records: Arc::new(MemoryRecordStore::new()),
            guest_records: Arc::new(MemoryRecordStore::new()),
        }
    }

    /// Host creates, guest joins
    pub async fn seat(
        &self,
        config: &DuelConfig,
    ) -> (Session<MemoryConnection>, Session<MemoryConnection>) {
        let mut host = Session::create_room(
            self.host_conn.clone(),
            self.host_records.clone(),
            config.clone(),
        )
        .await
        .unwrap();
        let guest = Session::join_room(
            self.guest_conn.clone(),
            self.guest_records.clone(),
            config.clone(),
            host.code().as_str(),
        )
        .await
        .unwrap();
        host.wait_for_opponent().await.unwrap();
        (host, guest)
    }

    /// Seat both players, submit teams and start
    pub async fn start(
        &self,
        config: &DuelConfig,
    ) -> (Battle<MemoryConnection>, Battle<MemoryConnection>) {
        self.start_with(config, team(1), team(11)).await
    }

    pub async fn start_with(
        &self,
        config: &DuelConfig,
        host_team: Vec<CombatantData>,
        guest_team: Vec<CombatantData>,
    ) -> (Battle<MemoryConnection>, Battle<MemoryConnection>) {
        let (mut host, mut guest) = self.seat(config).await;
        host.submit_team(host_team).await.unwrap();
        guest.submit_team(guest_team).await.unwrap();

        let (host_battle, guest_battle) =
            tokio::join!(host.await_both_ready(), guest.await_both_ready());
        (host_battle.unwrap(), guest_battle.unwrap())
    }
}

/// Drain events until the battle ends
pub fn record_events(battle: &mut Battle<MemoryConnection>) -> JoinHandle<Vec<BattleEvent>> {
    let events = battle.take_events().unwrap();
    tokio::spawn(collect(events, None))
}

/// Drain events, answering every turn of ours with move 0
pub fn autopilot(battle: &mut Battle<MemoryConnection>) -> JoinHandle<Vec<BattleEvent>> {
    let events = battle.take_events().unwrap();
    tokio::spawn(collect(events, Some(battle.handle())))
}

async fn collect(
    mut events: mpsc::UnboundedReceiver<BattleEvent>,
    pilot: Option<pokeduel_client::BattleHandle>,
) -> Vec<BattleEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        if let (Some(handle), BattleEvent::TurnStarted { mine: true }) = (&pilot, &event) {
            handle.choose_move(0).ok();
        }
        let ended = matches!(event, BattleEvent::Ended(_));
        seen.push(event);
        if ended {
            break;
        }
    }
    seen
}

pub fn count<F: Fn(&BattleEvent) -> bool>(events: &[BattleEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}
