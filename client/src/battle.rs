//! The battle event loop.
//!
//! One task per client merges three inputs with `tokio::select!`:
//!
//! ```text
//! room snapshots ──┐
//! BattleHandle ────┼──> Battle::run ──> Duel ──> BattleEvent stream
//! countdowns ──────┘                      │
//!                                         └──> own slot / currentTurn writes
//! ```
//!
//! Each room snapshot is compared with the previous one in a fixed order:
//! opponent move, opponent active index, opponent HP, opponent presence,
//! turn ownership.

use std::sync::{Arc, RwLock};

use futures_util::StreamExt;
use pokeduel_battle::{BattleError, Duel, Outcome, Substitution};
use pokeduel_protocol::{PlayerRole, Room, RoomCode};
use rand::Rng;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::DuelConfig;
use crate::event::BattleEvent;
use crate::handle::{BattleHandle, Command};
use crate::presence::{PresenceChange, PresenceKeeper, PresenceMonitor};
use crate::record::RecordStore;
use crate::room::SharedRoom;
use crate::slot::{OpponentView, OwnSlot};
use crate::store::{DocumentStore, StoreError, Subscription};
use crate::timer::{Countdown, TimerKind, TimerMessage};
use crate::DuelError;

/// A started battle, driven by [`run`](Self::run).
///
/// # Example
///
/// ```ignore
/// let mut battle = session.await_both_ready().await?;
/// let handle = battle.handle();
/// let mut events = battle.take_events().unwrap();
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         if let BattleEvent::TurnStarted { mine: true } = event {
///             handle.choose_move(0).ok();
///         }
///     }
/// });
///
/// let outcome = battle.run().await?;
/// ```
pub struct Battle<S: DocumentStore> {
    room: SharedRoom<S>,
    slot: OwnSlot<S>,
    records: Arc<dyn RecordStore>,
    config: DuelConfig,
    duel: Duel,
    shared: Arc<RwLock<Duel>>,
    keeper: Option<PresenceKeeper>,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<BattleEvent>,
    events: Option<mpsc::UnboundedReceiver<BattleEvent>>,
    timers: mpsc::UnboundedReceiver<TimerMessage>,
    turn_timer: Countdown,
    presence: PresenceMonitor,
    last_room: Option<Room>,
    announced_turn: Option<PlayerRole>,
    window_open: bool,
    /// Turn handover that still has to reach the store
    unsent_turn: Option<PlayerRole>,
    rejected_seq: Option<u32>,
}

impl<S: DocumentStore> Battle<S> {
    pub(crate) fn new(
        room: SharedRoom<S>,
        slot: OwnSlot<S>,
        records: Arc<dyn RecordStore>,
        config: DuelConfig,
        duel: Duel,
        keeper: Option<PresenceKeeper>,
    ) -> Self {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (timer_tx, timers) = mpsc::unbounded_channel();

        let turn_timer = Countdown::new(TimerKind::Turn, config.tick_interval, timer_tx.clone());
        let grace = Countdown::new(TimerKind::Grace, config.tick_interval, timer_tx);
        let mut presence = PresenceMonitor::new(grace, config.disconnect_timeout);
        presence.arm();

        Self {
            room,
            slot,
            records,
            config,
            shared: Arc::new(RwLock::new(duel.clone())),
            duel,
            keeper,
            commands_tx,
            commands,
            events_tx,
            events: Some(events),
            timers,
            turn_timer,
            presence,
            last_room: None,
            announced_turn: None,
            window_open: false,
            unsent_turn: None,
            rejected_seq: None,
        }
    }

    pub fn handle(&self) -> BattleHandle {
        BattleHandle::new(self.commands_tx.clone(), self.shared.clone())
    }

    /// Take the event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<BattleEvent>> {
        self.events.take()
    }

    pub fn duel(&self) -> &Duel {
        &self.duel
    }

    pub fn code(&self) -> &RoomCode {
        self.room.code()
    }

    pub fn role(&self) -> PlayerRole {
        self.duel.me()
    }

    /// Play until the battle ends.
    ///
    /// Fails with [`DuelError::RoomGone`] if the room disappears before an
    /// outcome is reached.
    pub async fn run(mut self) -> Result<Outcome, DuelError> {
        let mut snapshots = self.room.subscribe().await?;
        tracing::info!(
            room = %self.room.code(),
            role = %self.duel.me(),
            turn = %self.duel.current_turn(),
            "Battle started"
        );
        self.emit(BattleEvent::Started {
            me: self.duel.me(),
            turn: self.duel.current_turn(),
        });

        let result = self.drive(&mut snapshots).await;
        self.room.unsubscribe(&snapshots).await;
        result
    }

    async fn drive(&mut self, snapshots: &mut Subscription) -> Result<Outcome, DuelError> {
        loop {
            if let Some(outcome) = self.duel.outcome() {
                self.finish(outcome).await;
                return Ok(outcome);
            }

            tokio::select! {
                snapshot = snapshots.next() => match snapshot {
                    Some(value) => self.on_snapshot(value).await?,
                    None => return Err(StoreError::Closed.into()),
                },
                Some(command) = self.commands.recv() => self.on_command(command).await,
                Some(msg) = self.timers.recv() => self.on_timer(msg).await,
            }

            self.sync_turn();
            self.publish();
        }
    }

    async fn on_snapshot(&mut self, value: Option<Value>) -> Result<(), DuelError> {
        let room = match self.room.decode(value) {
            Ok(Some(room)) => room,
            Ok(None) => return Err(self.room_vanished().await),
            Err(e) => {
                tracing::warn!(room = %self.room.code(), error = %e, "Ignoring malformed room snapshot");
                self.diagnostic(e.to_string());
                return Ok(());
            }
        };

        self.flush_turn().await;

        let previous = self.last_room.take();
        self.apply_opponent_move(&room).await;
        self.apply_opponent_active(&room, previous.as_ref());
        self.apply_opponent_hp(&room);
        self.apply_presence(&room);
        self.apply_turn(&room, previous.as_ref());
        self.last_room = Some(room);
        Ok(())
    }

    async fn apply_opponent_move(&mut self, room: &Room) {
        if !self.duel.is_in_progress() {
            return;
        }
        let opponent = OpponentView::of(room, self.duel.me());
        let Some(submission) = opponent.current_move() else {
            return;
        };
        if self.rejected_seq == Some(submission.seq) {
            return;
        }

        match self.duel.observe_opponent_move(submission) {
            Ok(None) => {}
            Ok(Some(exchange)) => {
                tracing::debug!(
                    room = %self.room.code(),
                    seq = submission.seq,
                    damage = exchange.resolution.damage,
                    hp = exchange.resolution.defender_hp,
                    "Resolved opponent move"
                );
                let substitution = exchange.substitution;
                self.emit(BattleEvent::MoveResolved(exchange));
                if let Some(sub) = substitution {
                    self.emit(BattleEvent::Substituted {
                        side: sub.side,
                        index: sub.index,
                    });
                }
                if !self.duel.is_terminal() {
                    self.publish_own_team(submission.seq, substitution).await;
                }
            }
            Err(e) => {
                tracing::warn!(
                    room = %self.room.code(),
                    seq = submission.seq,
                    error = %e,
                    "Rejected opponent move"
                );
                self.rejected_seq = Some(submission.seq);
                self.diagnostic(format!("Rejected opponent move {}: {}", submission.seq, e));
            }
        }
    }

    /// Write our team's HP after being hit, the move we resolved, and our
    /// replacement if one came out
    async fn publish_own_team(&mut self, seq: u32, substitution: Option<Substitution>) {
        let team = self.duel.my_team().to_protocol();
        let written = match self.slot.set_team(&team).await {
            Ok(()) => self.slot.set_seen_seq(seq).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(room = %self.room.code(), error = %e, "Failed to publish team HP");
            self.diagnostic(format!("Failed to publish team HP: {}", e));
        }

        let me = self.duel.me();
        if let Some(sub) = substitution.filter(|s| s.side == me)
            && let Err(e) = self.slot.set_active_index(sub.index).await
        {
            tracing::warn!(room = %self.room.code(), error = %e, "Failed to publish replacement");
            self.diagnostic(format!("Failed to publish replacement: {}", e));
        }
    }

    fn apply_opponent_active(&mut self, room: &Room, previous: Option<&Room>) {
        if !self.duel.is_in_progress() {
            return;
        }
        let me = self.duel.me();
        let Some(index) = OpponentView::of(room, me).active_index() else {
            return;
        };
        let before = previous.and_then(|p| OpponentView::of(p, me).active_index());
        if before == Some(index) {
            return;
        }

        match self.duel.observe_opponent_active(index) {
            Ok(true) => self.emit(BattleEvent::Substituted {
                side: me.opponent(),
                index,
            }),
            Ok(false) => {}
            Err(e) => self.diagnostic(format!("Rejected opponent active index {}: {}", index, e)),
        }
    }

    fn apply_opponent_hp(&mut self, room: &Room) {
        if let Some(team) = OpponentView::of(room, self.duel.me()).team() {
            self.duel.sync_opponent_hp(team);
        }
    }

    fn apply_presence(&mut self, room: &Room) {
        if !self.duel.is_in_progress() {
            return;
        }
        let online = OpponentView::of(room, self.duel.me()).online();

        match self.presence.observe(online) {
            PresenceChange::WentOffline => {
                tracing::warn!(
                    room = %self.room.code(),
                    grace = ?self.presence.budget(),
                    "Opponent went offline"
                );
                self.emit(BattleEvent::OpponentOffline {
                    grace: self.presence.budget(),
                });
            }
            PresenceChange::CameBack => {
                tracing::info!(room = %self.room.code(), "Opponent reconnected");
                self.emit(BattleEvent::OpponentBack);
            }
            PresenceChange::Unchanged => {}
        }
    }

    fn apply_turn(&mut self, room: &Room, previous: Option<&Room>) {
        let Some(owner) = room.current_turn else {
            return;
        };
        if previous.and_then(|p| p.current_turn) == Some(owner) {
            return;
        }
        self.duel.set_current_turn(owner);
    }

    /// Open or close our move window to match turn ownership
    fn sync_turn(&mut self) {
        if !self.duel.is_in_progress() {
            self.window_open = false;
            self.turn_timer.cancel();
            return;
        }

        let owner = self.duel.current_turn();
        if self.announced_turn == Some(owner) {
            return;
        }
        self.announced_turn = Some(owner);

        let mine = owner == self.duel.me();
        self.turn_timer.cancel();
        self.window_open = mine;
        if mine {
            self.turn_timer.start(self.config.turn_time_limit);
        }
        tracing::debug!(room = %self.room.code(), turn = %owner, "Turn changed");
        self.emit(BattleEvent::TurnStarted { mine });
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::ChooseMove(index) => self.attack(index).await,
        }
    }

    async fn on_timer(&mut self, msg: TimerMessage) {
        match msg {
            TimerMessage::Tick {
                kind: TimerKind::Turn,
                remaining,
                ..
            } if self.turn_timer.is_current(&msg) => {
                self.emit(BattleEvent::TimerTick { remaining });
            }
            TimerMessage::Tick {
                kind: TimerKind::Grace,
                remaining,
                ..
            } if self.presence.countdown().is_current(&msg) => {
                self.emit(BattleEvent::GraceTick { remaining });
            }
            TimerMessage::Expired {
                kind: TimerKind::Turn,
                ..
            } => {
                if self.turn_timer.take_expiry(&msg) {
                    self.auto_move().await;
                }
            }
            TimerMessage::Expired {
                kind: TimerKind::Grace,
                ..
            } => {
                if self.presence.countdown_mut().take_expiry(&msg) {
                    self.on_grace_expired();
                }
            }
            _ => tracing::trace!(message = ?msg, "Dropping stale timer message"),
        }
    }

    async fn auto_move(&mut self) {
        let Some(count) = self
            .duel
            .my_active()
            .map(|c| c.moves.len())
            .filter(|n| *n > 0)
        else {
            self.diagnostic("No move available for automatic selection".to_string());
            return;
        };

        let move_index = rand::thread_rng().gen_range(0..count);
        tracing::info!(room = %self.room.code(), move_index, "Turn timer expired, choosing a move");
        self.emit(BattleEvent::AutoMove { move_index });
        self.attack(move_index).await;
    }

    async fn attack(&mut self, index: usize) {
        if !self.window_open {
            self.diagnostic(BattleError::NotYourTurn(self.duel.me()).to_string());
            return;
        }

        let submission = match self.duel.prepare_attack(index) {
            Ok(submission) => submission,
            Err(e) => {
                self.diagnostic(format!("Move {} rejected: {}", index, e));
                return;
            }
        };

        self.window_open = false;
        self.turn_timer.cancel();

        if let Err(e) = self.slot.submit_move(&submission).await {
            tracing::warn!(room = %self.room.code(), error = %e, "Failed to publish move");
            self.diagnostic(format!("Failed to publish move: {}", e));
            self.window_open = true;
            self.turn_timer.start(self.config.turn_time_limit);
            return;
        }

        let exchange = match self.duel.commit_attack(&submission) {
            Ok(exchange) => exchange,
            Err(e) => {
                tracing::error!(room = %self.room.code(), error = %e, "Published move could not be resolved");
                self.diagnostic(e.to_string());
                return;
            }
        };

        tracing::debug!(
            room = %self.room.code(),
            seq = submission.seq,
            damage = exchange.resolution.damage,
            hp = exchange.resolution.defender_hp,
            "Resolved our move"
        );
        let substitution = exchange.substitution;
        let pass_turn_to = exchange.pass_turn_to;
        self.emit(BattleEvent::MoveResolved(exchange));
        if let Some(sub) = substitution {
            self.emit(BattleEvent::Substituted {
                side: sub.side,
                index: sub.index,
            });
        }

        if let Some(next) = pass_turn_to {
            self.unsent_turn = Some(next);
            self.flush_turn().await;
        }
    }

    async fn flush_turn(&mut self) {
        let Some(next) = self.unsent_turn else {
            return;
        };
        match self.room.pass_turn(next).await {
            Ok(()) => self.unsent_turn = None,
            Err(e) => {
                tracing::warn!(room = %self.room.code(), error = %e, "Failed to hand over the turn");
                self.diagnostic(format!("Failed to hand over the turn: {}", e));
            }
        }
    }

    fn on_grace_expired(&mut self) {
        tracing::warn!(room = %self.room.code(), "Opponent did not return in time");
        self.turn_timer.cancel();
        self.window_open = false;
        self.duel.opponent_disconnected();
    }

    async fn release_presence(&mut self) {
        if let Some(keeper) = self.keeper.take() {
            keeper.stop();
        }
        if let Err(e) = self.slot.cancel_offline_marker().await {
            tracing::debug!(room = %self.room.code(), error = %e, "Could not cancel offline marker");
        }
    }

    async fn finish(&mut self, outcome: Outcome) {
        self.turn_timer.cancel();
        self.presence.cancel();
        self.window_open = false;
        self.release_presence().await;

        // only the losing or waiting side removes the room
        if matches!(outcome, Outcome::Lost | Outcome::OpponentDisconnected)
            && let Err(e) = self.room.remove().await
        {
            tracing::warn!(room = %self.room.code(), error = %e, "Failed to remove room");
        }
        if let Err(e) = self.records.clear() {
            tracing::warn!(error = %e, "Failed to clear session record");
        }

        tracing::info!(room = %self.room.code(), outcome = ?outcome, "Battle finished");
        self.publish();
        self.emit(BattleEvent::Ended(outcome));
    }

    async fn room_vanished(&mut self) -> DuelError {
        tracing::warn!(room = %self.room.code(), "Room removed mid-battle");
        self.turn_timer.cancel();
        self.presence.cancel();
        self.window_open = false;
        self.release_presence().await;
        if let Err(e) = self.records.clear() {
            tracing::warn!(error = %e, "Failed to clear session record");
        }
        DuelError::RoomGone(self.room.code().clone())
    }

    fn publish(&self) {
        if let Ok(mut shared) = self.shared.write() {
            *shared = self.duel.clone();
        }
    }

    fn emit(&self, event: BattleEvent) {
        let _ = self.events_tx.send(event);
    }

    fn diagnostic(&self, message: String) {
        self.emit(BattleEvent::Diagnostic(message));
    }
}
