//! Local session record.
//!
//! A small JSON blob kept on the player's machine so a restarted client can
//! find its way back into a running room.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pokeduel_protocol::{PlayerRole, RoomCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name used by [`FileRecordStore`]
pub const RECORD_FILE: &str = "pokeduel_session.json";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Record I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub room_code: RoomCode,
    pub player_identifier: PlayerRole,
    pub battle_started: bool,
    /// Epoch milliseconds when the record was written
    pub timestamp: i64,
}

impl SessionRecord {
    pub fn new(room_code: RoomCode, player_identifier: PlayerRole) -> Self {
        Self::new_at(room_code, player_identifier, Utc::now())
    }

    pub fn new_at(room_code: RoomCode, player_identifier: PlayerRole, now: DateTime<Utc>) -> Self {
        Self {
            room_code,
            player_identifier,
            battle_started: false,
            timestamp: now.timestamp_millis(),
        }
    }

    /// Same record marked as in battle, stamped now
    pub fn started(self) -> Self {
        Self {
            battle_started: true,
            timestamp: Utc::now().timestamp_millis(),
            ..self
        }
    }

    /// A record is usable for strictly less than `validity` after it was written
    pub fn is_expired_at(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        let age = now.timestamp_millis().saturating_sub(self.timestamp);
        let validity = i64::try_from(validity.as_millis()).unwrap_or(i64::MAX);
        age >= validity
    }
}

/// Durable storage for the single local [`SessionRecord`]
pub trait RecordStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>, RecordError>;
    fn save(&self, record: &SessionRecord) -> Result<(), RecordError>;
    fn clear(&self) -> Result<(), RecordError>;
}

/// Record kept in [`RECORD_FILE`] under a directory, rewritten whole on save
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(RECORD_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for FileRecordStore {
    fn load(&self) -> Result<Option<SessionRecord>, RecordError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), RecordError> {
        fs::write(&self.path, serde_json::to_string(record)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), RecordError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Record held in memory as its serialized text
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    raw: Mutex<Option<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary stored text, valid or not
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot().clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self) -> Result<Option<SessionRecord>, RecordError> {
        match self.slot().as_deref() {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), RecordError> {
        *self.slot() = Some(serde_json::to_string(record)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), RecordError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn code() -> RoomCode {
        RoomCode::parse("482913").unwrap()
    }

    #[test]
    fn test_record_json_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let record = SessionRecord::new_at(code(), PlayerRole::Player2, now);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "roomCode": "482913",
                "playerIdentifier": "player2",
                "battleStarted": false,
                "timestamp": 1_700_000_000_000i64,
            })
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let written = Utc.timestamp_millis_opt(1_000_000).unwrap();
        let record = SessionRecord::new_at(code(), PlayerRole::Player1, written);
        let validity = Duration::from_secs(30 * 60);

        let just_before = written + chrono::Duration::milliseconds(30 * 60 * 1000 - 1);
        let exactly = written + chrono::Duration::minutes(30);
        assert!(!record.is_expired_at(just_before, validity));
        assert!(record.is_expired_at(exactly, validity));
    }

    #[test]
    fn test_started_keeps_identity() {
        let record = SessionRecord::new(code(), PlayerRole::Player1).started();
        assert!(record.battle_started);
        assert_eq!(record.room_code, code());
        assert_eq!(record.player_identifier, PlayerRole::Player1);
    }

    #[test]
    fn test_memory_store_cycle() {
        let store = MemoryRecordStore::new();
        assert!(store.load().unwrap().is_none());

        let record = SessionRecord::new(code(), PlayerRole::Player1);
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record() {
        let store = MemoryRecordStore::with_raw("{not json");
        assert!(matches!(store.load(), Err(RecordError::Json(_))));
    }

    #[test]
    fn test_file_store_cycle() {
        let dir = std::env::temp_dir().join(format!("pokeduel-record-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let store = FileRecordStore::new(&dir);
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
        let record = SessionRecord::new(code(), PlayerRole::Player2).started();
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        fs::remove_dir_all(&dir).ok();
    }
}
