//! Serverless two-player battles over a shared document store.
//!
//! Two clients meet in a room document, submit their teams, and take turns.
//! Each one resolves every move locally with `pokeduel-battle`; the store only
//! carries the inputs.
//!
//! # Overview
//!
//! ```text
//! Session::create_room / join_room
//!        │ submit_team
//!        ▼
//! Session::await_both_ready ──> Battle::run ──> Outcome
//!                                  ▲
//! reconnect::resume ───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pokeduel_client::{DuelConfig, MemoryRecordStore, MemoryStore, Session};
//!
//! let store = MemoryStore::new();
//! let records = Arc::new(MemoryRecordStore::new());
//!
//! let mut host = Session::create_room(store.connect(), records, DuelConfig::default()).await?;
//! println!("Room code: {}", host.code());
//! host.wait_for_opponent().await?;
//! host.submit_team(team).await?;
//!
//! let battle = host.await_both_ready().await?;
//! let outcome = battle.run().await?;
//! ```

mod battle;
mod config;
mod error;
mod event;
mod handle;
pub mod presence;
pub mod reconnect;
pub mod record;
mod room;
mod session;
pub mod slot;
pub mod store;
pub mod timer;

pub use battle::Battle;
pub use config::DuelConfig;
pub use error::DuelError;
pub use event::BattleEvent;
pub use handle::BattleHandle;
pub use reconnect::{Resumed, resume, resume_at};
pub use record::{FileRecordStore, MemoryRecordStore, RecordError, RecordStore, SessionRecord};
pub use room::SharedRoom;
pub use session::Session;
pub use slot::{OpponentView, OwnSlot};
pub use store::{DocumentStore, MemoryConnection, MemoryStore, StoreError, Subscription};

// Re-export commonly used types from the other crates
pub use pokeduel_battle::{Duel, Exchange, Outcome, Phase};
pub use pokeduel_protocol::{CombatantData, PlayerRole, RoomCode};
