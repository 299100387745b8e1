use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Timing and sizing knobs for a duel.
///
/// Durations deserialize from whole seconds:
///
/// ```
/// # use pokeduel_client::DuelConfig;
/// let config: DuelConfig = serde_json::from_str(r#"{"turn_time_limit": 10}"#).unwrap();
/// assert_eq!(config.turn_time_limit.as_secs(), 10);
/// assert_eq!(config.team_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    /// Time to pick a move before one is chosen at random
    #[serde(deserialize_with = "seconds")]
    pub turn_time_limit: Duration,
    /// How long an offline opponent has to come back
    #[serde(deserialize_with = "seconds")]
    pub disconnect_timeout: Duration,
    /// Interval between advisory countdown ticks
    #[serde(deserialize_with = "seconds")]
    pub tick_interval: Duration,
    /// Age at which a saved session record is discarded
    #[serde(deserialize_with = "seconds")]
    pub record_validity: Duration,
    pub team_size: usize,
    /// Draws of a fresh room code before giving up
    pub room_code_attempts: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            turn_time_limit: Duration::from_secs(30),
            disconnect_timeout: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
            record_validity: Duration::from_secs(30 * 60),
            team_size: pokeduel_team::TEAM_SIZE,
            room_code_attempts: 5,
        }
    }
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}
