//! Cancellable countdowns.
//!
//! A [`Countdown`] owns one spawned task that reports ticks and a final
//! expiry over a channel. Every start or cancel moves it to a new
//! generation, and messages carry the generation they were sent under, so a
//! receiver can drop anything from a countdown that has since been replaced.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Our move window
    Turn,
    /// Waiting for an offline opponent
    Grace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMessage {
    Tick {
        kind: TimerKind,
        generation: u64,
        remaining: Duration,
    },
    Expired {
        kind: TimerKind,
        generation: u64,
    },
}

impl TimerMessage {
    pub fn kind(&self) -> TimerKind {
        match self {
            TimerMessage::Tick { kind, .. } | TimerMessage::Expired { kind, .. } => *kind,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            TimerMessage::Tick { generation, .. } | TimerMessage::Expired { generation, .. } => {
                *generation
            }
        }
    }
}

#[derive(Debug)]
pub struct Countdown {
    kind: TimerKind,
    tick: Duration,
    generation: u64,
    tx: mpsc::UnboundedSender<TimerMessage>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new(kind: TimerKind, tick: Duration, tx: mpsc::UnboundedSender<TimerMessage>) -> Self {
        Self {
            kind,
            tick: tick.max(Duration::from_millis(1)),
            generation: 0,
            tx,
            task: None,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start counting down `budget`, replacing any countdown in flight
    pub fn start(&mut self, budget: Duration) -> u64 {
        self.cancel();

        let kind = self.kind;
        let generation = self.generation;
        let tick = self.tick;
        let tx = self.tx.clone();
        let deadline = Instant::now() + budget;

        self.task = Some(tokio::spawn(async move {
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    let _ = tx.send(TimerMessage::Expired { kind, generation });
                    return;
                }
                let tick_msg = TimerMessage::Tick {
                    kind,
                    generation,
                    remaining,
                };
                if tx.send(tick_msg).is_err() {
                    return;
                }
                tokio::time::sleep(remaining.min(tick)).await;
            }
        }));

        tracing::trace!(kind = ?kind, generation, budget = ?budget, "Countdown started");
        generation
    }

    /// Stop the countdown. Safe to call when nothing is running.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether `msg` comes from the countdown currently running
    pub fn is_current(&self, msg: &TimerMessage) -> bool {
        self.task.is_some() && msg.kind() == self.kind && msg.generation() == self.generation
    }

    /// Accept an expiry from the current generation. Returns false for stale ones.
    pub fn take_expiry(&mut self, msg: &TimerMessage) -> bool {
        if !matches!(msg, TimerMessage::Expired { .. }) || !self.is_current(msg) {
            return false;
        }
        self.task = None;
        self.generation += 1;
        true
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
