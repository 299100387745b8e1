use pokeduel_battle::BattleError;
use pokeduel_protocol::{DocPath, RoomCode, SchemaError};
use pokeduel_team::TeamError;
use thiserror::Error;

use crate::record::RecordError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DuelError {
    #[error("Room {0} does not exist")]
    RoomNotFound(RoomCode),

    #[error("Room {0} no longer exists")]
    RoomGone(RoomCode),

    #[error("Room {0} already has two players")]
    RoomFull(RoomCode),

    #[error("No free room code after {0} attempts")]
    NoFreeRoomCode(u32),

    #[error("Battle already started")]
    AlreadyStarted,

    #[error("Battle loop has stopped")]
    LoopClosed,

    #[error("Malformed document at {path}: {source}")]
    MalformedDocument {
        path: DocPath,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Team(#[from] TeamError),
}
