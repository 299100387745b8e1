//! Picking a session back up after the process restarts.
//!
//! The local [`SessionRecord`] says which room and seat we had. The room
//! document says how far things got. Together they decide where to resume.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pokeduel_battle::{Duel, Outcome, Team};
use pokeduel_protocol::{MoveSubmission, PlayerRole, PlayerSlot, Room};

use crate::battle::Battle;
use crate::config::DuelConfig;
use crate::presence::register_presence;
use crate::record::{RecordError, RecordStore};
use crate::room::SharedRoom;
use crate::session::Session;
use crate::slot::{OpponentView, OwnSlot};
use crate::store::DocumentStore;
use crate::DuelError;

/// Where a restarted client ends up
pub enum Resumed<S: DocumentStore> {
    /// Nothing to resume; start from the lobby
    Fresh,
    /// Back in team selection with our team withdrawn
    TeamSelection(Session<S>),
    InProgress(Battle<S>),
    /// The battle ended while we were away
    Terminated(Outcome),
}

impl<S: DocumentStore> std::fmt::Debug for Resumed<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resumed::Fresh => f.write_str("Fresh"),
            Resumed::TeamSelection(session) => {
                f.debug_tuple("TeamSelection").field(session.code()).finish()
            }
            Resumed::InProgress(battle) => f.debug_tuple("InProgress").field(battle.code()).finish(),
            Resumed::Terminated(outcome) => f.debug_tuple("Terminated").field(outcome).finish(),
        }
    }
}

pub async fn resume<S: DocumentStore>(
    store: S,
    records: Arc<dyn RecordStore>,
    config: DuelConfig,
) -> Result<Resumed<S>, DuelError> {
    resume_at(store, records, config, Utc::now()).await
}

/// [`resume`] with an explicit clock
pub async fn resume_at<S: DocumentStore>(
    store: S,
    records: Arc<dyn RecordStore>,
    config: DuelConfig,
    now: DateTime<Utc>,
) -> Result<Resumed<S>, DuelError> {
    let record = match records.load() {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(Resumed::Fresh),
        Err(RecordError::Json(e)) => {
            tracing::warn!(error = %e, "Discarding corrupt session record");
            records.clear()?;
            return Ok(Resumed::Fresh);
        }
        Err(e) => return Err(e.into()),
    };

    if record.is_expired_at(now, config.record_validity) {
        tracing::info!(room = %record.room_code, "Session record expired");
        records.clear()?;
        return Ok(Resumed::Fresh);
    }

    let code = record.room_code.clone();
    let me = record.player_identifier;
    let room = SharedRoom::new(store.clone(), code.clone());

    let Some(snapshot) = room.read().await? else {
        tracing::info!(room = %code, "Saved room no longer exists");
        records.clear()?;
        return Err(DuelError::RoomGone(code));
    };

    let slot = OwnSlot::new(store.clone(), code.clone(), me);
    let keeper = register_presence(&slot).await?;

    if snapshot.both_teams_present() && record.battle_started {
        let duel = restore_duel(&snapshot, me)?;

        if let Some(outcome) = duel.outcome() {
            tracing::info!(room = %code, outcome = ?outcome, "Battle ended while we were away");
            keeper.stop();
            slot.cancel_offline_marker().await?;
            if outcome == Outcome::Lost {
                room.remove().await?;
            }
            records.clear()?;
            return Ok(Resumed::Terminated(outcome));
        }

        if OpponentView::of(&snapshot, me).is_offline() {
            tracing::warn!(room = %code, "Opponent went offline while we were away");
            keeper.stop();
            slot.cancel_offline_marker().await?;
            room.remove().await?;
            records.clear()?;
            return Ok(Resumed::Terminated(Outcome::OpponentDisconnected));
        }

        let seen = snapshot.slot(me).and_then(|s| s.seen_seq);
        if let Some(seq) = duel.opponent_seq().filter(|seq| Some(*seq) != seen) {
            slot.set_team(&duel.my_team().to_protocol()).await?;
            slot.set_seen_seq(seq).await?;
            slot.set_active_index(duel.my_team().active_index()).await?;
        }
        if !duel.is_my_turn() && snapshot.current_turn != Some(duel.current_turn()) {
            room.pass_turn(duel.current_turn()).await?;
        }

        tracing::info!(room = %code, role = %me, turn = %duel.current_turn(), "Resuming battle");
        return Ok(Resumed::InProgress(Battle::new(
            room,
            slot,
            records,
            config,
            duel,
            Some(keeper),
        )));
    }

    if snapshot.any_ready() {
        slot.set_ready(false).await?;
        slot.clear_team().await?;
        tracing::info!(room = %code, role = %me, "Resuming team selection");
        return Ok(Resumed::TeamSelection(Session::from_parts(
            store, records, config, code, me, keeper,
        )));
    }

    tracing::info!(room = %code, "Nothing to resume");
    Session::from_parts(store, records, config, code, me, keeper)
        .leave()
        .await?;
    Ok(Resumed::Fresh)
}

/// Rebuild a running duel from the room document.
///
/// Each published team already reflects the moves its owner acknowledged
/// through `seenSeq`. A move the other side has not acknowledged yet is
/// replayed on top, so both peers come back with the same HP.
fn restore_duel(room: &Room, me: PlayerRole) -> Result<Duel, DuelError> {
    let empty = PlayerSlot::default();
    let mine = room.slot(me).unwrap_or(&empty);
    let theirs = room.slot(me.opponent()).unwrap_or(&empty);
    let published_turn = room.current_turn.unwrap_or_else(|| room.first_mover());

    let my_move = unacknowledged(mine, theirs);
    let their_move = unacknowledged(theirs, mine);
    let my_seq = mine.current_move.as_ref().map_or(0, |m| m.seq);

    let turn = match (my_move, their_move) {
        (Some(_), _) => me,
        (None, Some(_)) => me.opponent(),
        (None, None) => published_turn,
    };
    let mut duel = Duel::restore(
        me,
        turn,
        restore_team(mine)?,
        restore_team(theirs)?,
        my_move.map_or(my_seq, |m| m.seq - 1),
        mine.seen_seq,
    );

    if let Some(submission) = my_move
        && duel.is_in_progress()
    {
        duel.commit_attack(submission)?;
    }
    if let Some(submission) = their_move
        && duel.is_in_progress()
    {
        duel.observe_opponent_move(submission)?;
    }
    if my_move.is_none() {
        duel.set_current_turn(published_turn);
    }
    Ok(duel)
}

/// `mover`'s last move, if `other` has not resolved it yet
fn unacknowledged<'a>(mover: &'a PlayerSlot, other: &PlayerSlot) -> Option<&'a MoveSubmission> {
    mover
        .current_move
        .as_ref()
        .filter(|m| m.seq > other.seen_seq.unwrap_or(0))
}

fn restore_team(slot: &PlayerSlot) -> Result<Team, DuelError> {
    let records = slot.team.as_deref().unwrap_or_default();
    let mut team = Team::from_protocol(records, slot.active_pokemon_index)?;

    // a replacement may not have been published before the restart
    if team.active().is_some_and(|c| c.is_fainted())
        && let Some(next) = team.next_alive()
    {
        team.set_active(next)?;
    }
    Ok(team)
}
