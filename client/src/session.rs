//! Room creation, joining and team submission up to the battle start

use std::sync::Arc;

use futures_util::StreamExt;
use pokeduel_battle::{Combatant, Duel, Phase};
use pokeduel_protocol::{CombatantData, PlayerRole, Room, RoomCode};
use pokeduel_team::prepare_for_battle;
use rand::Rng;

use crate::battle::Battle;
use crate::config::DuelConfig;
use crate::presence::{PresenceKeeper, register_presence};
use crate::record::{RecordStore, SessionRecord};
use crate::room::SharedRoom;
use crate::slot::{OpponentView, OwnSlot};
use crate::store::{DocumentStore, StoreError};
use crate::DuelError;

/// One player's seat in a room, before the battle begins
pub struct Session<S: DocumentStore> {
    store: S,
    records: Arc<dyn RecordStore>,
    config: DuelConfig,
    room: SharedRoom<S>,
    slot: OwnSlot<S>,
    phase: Phase,
    keeper: Option<PresenceKeeper>,
    started: bool,
}

impl<S: DocumentStore> Session<S> {
    /// Open a new room as host under a freshly drawn code
    pub async fn create_room(
        store: S,
        records: Arc<dyn RecordStore>,
        config: DuelConfig,
    ) -> Result<Self, DuelError> {
        for attempt in 1..=config.room_code_attempts {
            let n = rand::thread_rng().gen_range(RoomCode::MIN..=RoomCode::MAX);
            let code = RoomCode::from_number(n)?;
            let room = SharedRoom::new(store.clone(), code.clone());

            if room.exists().await? {
                tracing::debug!(room = %code, attempt, "Room code taken, drawing again");
                continue;
            }

            room.create(&Room::open()).await?;
            tracing::info!(room = %code, "Room created");
            return Self::seated(store, records, config, code, PlayerRole::HOST).await;
        }

        Err(DuelError::NoFreeRoomCode(config.room_code_attempts))
    }

    /// Take the second seat in the room with the given code
    pub async fn join_room(
        store: S,
        records: Arc<dyn RecordStore>,
        config: DuelConfig,
        code: &str,
    ) -> Result<Self, DuelError> {
        let code = RoomCode::parse(code)?;
        let room = SharedRoom::new(store.clone(), code.clone());
        let role = PlayerRole::HOST.opponent();

        let Some(snapshot) = room.read().await? else {
            return Err(DuelError::RoomNotFound(code));
        };
        if snapshot.slot(role).is_some() {
            return Err(DuelError::RoomFull(code));
        }

        OwnSlot::new(store.clone(), code.clone(), role).take_seat().await?;
        tracing::info!(room = %code, "Joined room");
        Self::seated(store, records, config, code, role).await
    }

    async fn seated(
        store: S,
        records: Arc<dyn RecordStore>,
        config: DuelConfig,
        code: RoomCode,
        role: PlayerRole,
    ) -> Result<Self, DuelError> {
        let slot = OwnSlot::new(store.clone(), code.clone(), role);
        let keeper = register_presence(&slot).await?;
        records.save(&SessionRecord::new(code.clone(), role))?;

        Ok(Self::from_parts(store, records, config, code, role, keeper))
    }

    pub(crate) fn from_parts(
        store: S,
        records: Arc<dyn RecordStore>,
        config: DuelConfig,
        code: RoomCode,
        role: PlayerRole,
        keeper: PresenceKeeper,
    ) -> Self {
        Self {
            room: SharedRoom::new(store.clone(), code.clone()),
            slot: OwnSlot::new(store.clone(), code, role),
            store,
            records,
            config,
            phase: Phase::TeamSelection,
            keeper: Some(keeper),
            started: false,
        }
    }

    pub fn code(&self) -> &RoomCode {
        self.room.code()
    }

    pub fn role(&self) -> PlayerRole {
        self.slot.role()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_host(&self) -> bool {
        self.role() == PlayerRole::HOST
    }

    /// Wait until someone takes the other seat
    pub async fn wait_for_opponent(&mut self) -> Result<(), DuelError> {
        let opponent = self.role().opponent();
        let mut snapshots = self.room.subscribe().await?;

        let result = loop {
            let Some(value) = snapshots.next().await else {
                break Err(StoreError::Closed.into());
            };
            match self.room.decode(value) {
                Ok(Some(room)) if room.slot(opponent).is_some() => break Ok(()),
                Ok(Some(_)) => {}
                Ok(None) => break Err(DuelError::RoomGone(self.code().clone())),
                Err(e) => break Err(e),
            }
        };

        self.room.unsubscribe(&snapshots).await;
        if result.is_ok() {
            tracing::info!(room = %self.code(), "Opponent joined");
        }
        result
    }

    /// Publish our team and mark ourselves ready.
    ///
    /// The team must have exactly the configured number of members, each one
    /// a combatant the battle can use. Nothing is written otherwise.
    pub async fn submit_team(&mut self, team: Vec<CombatantData>) -> Result<(), DuelError> {
        if self.started {
            return Err(DuelError::AlreadyStarted);
        }
        let team = prepare_for_battle(team, self.config.team_size)?;
        for member in &team {
            Combatant::from_protocol(member)?;
        }

        self.slot.set_team(&team).await?;
        self.slot.set_ready(true).await?;
        self.phase = Phase::AwaitingBothReady;
        tracing::info!(room = %self.code(), role = %self.role(), "Team submitted");
        Ok(())
    }

    /// Wait for both seats to be ready and start the battle.
    ///
    /// Succeeds once per session; later calls fail with
    /// [`DuelError::AlreadyStarted`].
    pub async fn await_both_ready(&mut self) -> Result<Battle<S>, DuelError> {
        if self.started {
            return Err(DuelError::AlreadyStarted);
        }

        let team_size = self.config.team_size;
        let mut snapshots = self.room.subscribe().await?;
        let ready = loop {
            let Some(value) = snapshots.next().await else {
                break Err(StoreError::Closed.into());
            };
            match self.room.decode(value) {
                Ok(Some(room)) if room.both_ready(team_size) => break Ok(room),
                Ok(Some(_)) => {}
                Ok(None) => break Err(DuelError::RoomGone(self.code().clone())),
                Err(e) => break Err(e),
            }
        };
        self.room.unsubscribe(&snapshots).await;
        let room = ready?;

        let me = self.role();
        let first_mover = room.first_mover();
        let my_team = room
            .slot(me)
            .and_then(|s| s.team.as_deref())
            .unwrap_or_default();
        let opponent_team = OpponentView::of(&room, me).team().unwrap_or_default();
        let duel = Duel::start(me, first_mover, my_team, opponent_team)?;
        self.started = true;

        if me == first_mover && !room.game_started {
            self.room.initialize_battle(first_mover).await?;
        }
        self.slot.set_active_index(0).await?;

        let record = SessionRecord::new(self.code().clone(), me).started();
        self.records.save(&record)?;
        self.phase = duel.phase();

        tracing::info!(room = %self.code(), role = %me, first = %first_mover, "Both players ready");
        Ok(Battle::new(
            self.room.clone(),
            self.slot.clone(),
            self.records.clone(),
            self.config.clone(),
            duel,
            self.keeper.take(),
        ))
    }

    /// Give up the seat: presence goes offline and the local record is cleared
    pub async fn leave(mut self) -> Result<(), DuelError> {
        if let Some(keeper) = self.keeper.take() {
            keeper.stop();
        }
        self.slot.cancel_offline_marker().await?;
        match self.slot.set_online(false).await {
            Ok(()) | Err(DuelError::Store(StoreError::Offline)) => {}
            Err(e) => return Err(e),
        }
        self.records.clear()?;
        tracing::info!(room = %self.code(), role = %self.role(), "Left room");
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
