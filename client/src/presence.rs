//! Presence flags and the disconnect grace period.

use std::time::Duration;

use futures_util::StreamExt;
use pokeduel_protocol::DocPath;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::slot::OwnSlot;
use crate::store::DocumentStore;
use crate::timer::Countdown;
use crate::DuelError;

/// Mark our seat online and keep it that way across link drops.
///
/// Writes `online = true`, asks the store to write `online = false` when the
/// link drops, and spawns a [`PresenceKeeper`] that re-arms both whenever the
/// link comes back.
pub async fn register_presence<S: DocumentStore>(
    slot: &OwnSlot<S>,
) -> Result<PresenceKeeper, DuelError> {
    slot.set_online(true).await?;
    slot.arm_offline_marker().await?;
    PresenceKeeper::spawn(slot.clone()).await
}

/// Background task that restores our presence after every reconnect
#[derive(Debug)]
pub struct PresenceKeeper {
    task: JoinHandle<()>,
}

impl PresenceKeeper {
    async fn spawn<S: DocumentStore>(slot: OwnSlot<S>) -> Result<Self, DuelError> {
        let store = slot.store().clone();
        let mut connected = store.subscribe(&DocPath::connected()).await?;
        let room = DocPath::room(slot.code());

        let task = tokio::spawn(async move {
            // the first delivery is the state we just armed
            let mut was_online = true;
            while let Some(value) = connected.next().await {
                let online = value == Some(Value::Bool(true));
                if online && !was_online {
                    rearm(&slot, &store, &room).await;
                }
                was_online = online;
            }
        });

        Ok(Self { task })
    }

    /// Stop re-arming presence
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PresenceKeeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn rearm<S: DocumentStore>(slot: &OwnSlot<S>, store: &S, room: &DocPath) {
    match store.read(room).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::debug!(room = %slot.code(), "Room gone, presence not restored");
            return;
        }
        Err(e) => {
            tracing::warn!(room = %slot.code(), error = %e, "Could not check room after reconnect");
            return;
        }
    }

    let restored = async {
        slot.set_online(true).await?;
        slot.arm_offline_marker().await
    };
    match restored.await {
        Ok(()) => tracing::info!(room = %slot.code(), role = %slot.role(), "Presence restored"),
        Err(e) => tracing::warn!(room = %slot.code(), error = %e, "Failed to restore presence"),
    }
}

/// What an opponent presence update meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    /// Went offline; the grace countdown started
    WentOffline,
    /// Came back within the grace period
    CameBack,
    Unchanged,
}

/// Watches the opponent's presence flag and runs the grace countdown
#[derive(Debug)]
pub struct PresenceMonitor {
    grace: Countdown,
    budget: Duration,
    armed: bool,
}

impl PresenceMonitor {
    pub fn new(grace: Countdown, budget: Duration) -> Self {
        Self {
            grace,
            budget,
            armed: false,
        }
    }

    /// Start reacting to presence. Updates before this are ignored.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn observe(&mut self, online: Option<bool>) -> PresenceChange {
        if !self.armed {
            return PresenceChange::Unchanged;
        }

        match online {
            Some(false) if !self.grace.is_running() => {
                self.grace.start(self.budget);
                PresenceChange::WentOffline
            }
            Some(true) if self.grace.is_running() => {
                self.grace.cancel();
                PresenceChange::CameBack
            }
            _ => PresenceChange::Unchanged,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.grace.is_running()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn countdown(&self) -> &Countdown {
        &self.grace
    }

    pub fn countdown_mut(&mut self) -> &mut Countdown {
        &mut self.grace
    }

    pub fn cancel(&mut self) {
        self.grace.cancel();
    }
}
