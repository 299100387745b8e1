//! Duel - one player's view of a running battle

use pokeduel_protocol::{CombatantData, PlayerRole};

use super::phase::{Outcome, Phase};
use crate::BattleError;
use crate::types::{Combatant, Team};

/// A battle as seen by one of its two players.
///
/// Each peer holds its own `Duel` and feeds it the same moves in the same
/// order, so both arrive at the same HP values without talking to each other.
/// Only the player who attacked hands the turn over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duel {
    pub(crate) me: PlayerRole,
    pub(crate) phase: Phase,
    pub(crate) current_turn: PlayerRole,
    pub(crate) my_team: Team,
    pub(crate) opponent_team: Team,
    /// `seq` of our latest submission (0 before the first)
    pub(crate) my_seq: u32,
    /// `seq` of the latest opponent submission already resolved
    pub(crate) opponent_seq: Option<u32>,
}

impl Duel {
    /// Begin a battle with both first members on the field
    pub fn start(
        me: PlayerRole,
        first_mover: PlayerRole,
        my_team: &[CombatantData],
        opponent_team: &[CombatantData],
    ) -> Result<Self, BattleError> {
        Ok(Self {
            me,
            phase: Phase::InProgress,
            current_turn: first_mover,
            my_team: Team::from_protocol(my_team, 0)?,
            opponent_team: Team::from_protocol(opponent_team, 0)?,
            my_seq: 0,
            opponent_seq: None,
        })
    }

    /// Rebuild a battle that was already running, e.g. after a restart
    pub fn restore(
        me: PlayerRole,
        current_turn: PlayerRole,
        my_team: Team,
        opponent_team: Team,
        my_seq: u32,
        opponent_seq: Option<u32>,
    ) -> Self {
        let phase = if my_team.is_defeated() {
            Phase::Terminal(Outcome::Lost)
        } else if opponent_team.is_defeated() {
            Phase::Terminal(Outcome::Won)
        } else {
            Phase::InProgress
        };

        Self {
            me,
            phase,
            current_turn,
            my_team,
            opponent_team,
            my_seq,
            opponent_seq,
        }
    }

    pub fn me(&self) -> PlayerRole {
        self.me
    }

    pub fn opponent(&self) -> PlayerRole {
        self.me.opponent()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.phase.outcome()
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn current_turn(&self) -> PlayerRole {
        self.current_turn
    }

    pub fn is_my_turn(&self) -> bool {
        self.is_in_progress() && self.current_turn == self.me
    }

    pub fn my_team(&self) -> &Team {
        &self.my_team
    }

    pub fn opponent_team(&self) -> &Team {
        &self.opponent_team
    }

    pub fn my_active(&self) -> Option<&Combatant> {
        self.my_team.active()
    }

    pub fn opponent_active(&self) -> Option<&Combatant> {
        self.opponent_team.active()
    }

    pub fn my_seq(&self) -> u32 {
        self.my_seq
    }

    pub fn opponent_seq(&self) -> Option<u32> {
        self.opponent_seq
    }

    pub(crate) fn require_in_progress(&self) -> Result<(), BattleError> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(BattleError::NotInProgress(self.phase))
        }
    }
}

#[cfg(test)]
mod tests {
    use pokeduel_protocol::{BaseStats, MoveData};

    use super::*;

    fn record(id: u32, hp: u32) -> CombatantData {
        CombatantData {
            id,
            name: format!("mon-{}", id),
            sprite: String::new(),
            types: vec!["normal".into()],
            stats: BaseStats { hp: 50, attack: 50, defense: 50 },
            moves: vec![MoveData {
                name: "Tackle".into(),
                move_type: "normal".into(),
                power: 40,
            }],
            current_hp: hp,
            max_hp: 50,
        }
    }

    #[test]
    fn test_start() {
        let team = vec![record(1, 50), record(2, 50)];
        let duel = Duel::start(PlayerRole::Player2, PlayerRole::Player1, &team, &team).unwrap();

        assert!(duel.is_in_progress());
        assert!(!duel.is_my_turn());
        assert_eq!(duel.opponent(), PlayerRole::Player1);
        assert_eq!(duel.my_team().active_index(), 0);
        assert_eq!(duel.opponent_team().active_index(), 0);
        assert_eq!(duel.my_seq(), 0);
        assert_eq!(duel.opponent_seq(), None);
    }

    #[test]
    fn test_start_rejects_malformed_team() {
        let mut bad = record(1, 50);
        bad.types = vec!["plasma".into()];
        let good = vec![record(2, 50)];

        assert_eq!(
            Duel::start(PlayerRole::Player1, PlayerRole::Player1, &[bad], &good),
            Err(BattleError::UnknownType("plasma".into()))
        );
    }

    #[test]
    fn test_restore_detects_finished_battle() {
        let alive = Team::from_protocol(&[record(1, 10)], 0).unwrap();
        let fainted = Team::from_protocol(&[record(2, 0)], 0).unwrap();

        let duel = Duel::restore(
            PlayerRole::Player1,
            PlayerRole::Player2,
            alive.clone(),
            fainted.clone(),
            3,
            Some(2),
        );
        assert_eq!(duel.outcome(), Some(Outcome::Won));

        let duel = Duel::restore(PlayerRole::Player1, PlayerRole::Player1, fainted, alive, 0, None);
        assert_eq!(duel.outcome(), Some(Outcome::Lost));
    }
}
