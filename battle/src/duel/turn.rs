//! Turn transitions for a [`Duel`]

use pokeduel_protocol::{CombatantData, MoveSubmission, PlayerRole};

use super::phase::{Exchange, Outcome, Phase, Substitution};
use super::state::Duel;
use crate::BattleError;
use crate::damage;
use crate::types::{Move, Team};

impl Duel {
    /// Validate our move choice and build the submission to publish.
    ///
    /// Nothing changes until [`commit_attack`](Self::commit_attack) is called
    /// with the returned submission, so a failed publish leaves the duel as
    /// it was.
    pub fn prepare_attack(&self, move_index: usize) -> Result<MoveSubmission, BattleError> {
        self.require_in_progress()?;
        if self.current_turn != self.me {
            return Err(BattleError::NotYourTurn(self.me));
        }

        let active = self
            .my_team
            .active()
            .filter(|c| c.is_alive())
            .ok_or(BattleError::InvalidActiveIndex {
                index: self.my_team.active_index(),
            })?;

        let chosen = active
            .moves
            .get(move_index)
            .ok_or(BattleError::MoveIndexOutOfRange {
                index: move_index,
                available: active.moves.len(),
            })?;

        Ok(MoveSubmission {
            data: chosen.to_protocol(),
            seq: self.my_seq + 1,
        })
    }

    /// Resolve our published move and hand the turn to the opponent
    pub fn commit_attack(&mut self, submission: &MoveSubmission) -> Result<Exchange, BattleError> {
        self.require_in_progress()?;
        if self.current_turn != self.me {
            return Err(BattleError::NotYourTurn(self.me));
        }
        if submission.seq != self.my_seq + 1 {
            return Err(BattleError::StaleSubmission {
                seq: submission.seq,
            });
        }

        let move_used = Move::from_protocol(&submission.data)?;
        self.my_seq = submission.seq;

        let attacker = self.me;
        let mut exchange = strike(attacker, &move_used, &self.my_team, &mut self.opponent_team)?;

        if exchange.resolution.fainted {
            match self.opponent_team.next_alive() {
                Some(index) => {
                    self.opponent_team.set_active(index)?;
                    exchange.substitution = Some(Substitution {
                        side: self.opponent(),
                        index,
                    });
                }
                None => {
                    self.phase = Phase::Terminal(Outcome::Won);
                    exchange.outcome = Some(Outcome::Won);
                    return Ok(exchange);
                }
            }
        }

        self.current_turn = self.opponent();
        exchange.pass_turn_to = Some(self.current_turn);
        Ok(exchange)
    }

    /// Resolve a move the opponent published.
    ///
    /// Returns `Ok(None)` for a submission that was already resolved. Turn
    /// ownership is left alone: the opponent hands it over themselves.
    pub fn observe_opponent_move(
        &mut self,
        submission: &MoveSubmission,
    ) -> Result<Option<Exchange>, BattleError> {
        self.require_in_progress()?;
        if self.opponent_seq.is_some_and(|seen| submission.seq <= seen) {
            return Ok(None);
        }
        if self.current_turn != self.opponent() {
            return Err(BattleError::NotOpponentsTurn(self.opponent()));
        }

        let move_used = Move::from_protocol(&submission.data)?;
        let attacker = self.opponent();
        let mut exchange = strike(attacker, &move_used, &self.opponent_team, &mut self.my_team)?;
        self.opponent_seq = Some(submission.seq);

        if exchange.resolution.fainted {
            match self.my_team.next_alive() {
                Some(index) => {
                    self.my_team.set_active(index)?;
                    exchange.substitution = Some(Substitution {
                        side: self.me,
                        index,
                    });
                }
                None => {
                    self.phase = Phase::Terminal(Outcome::Lost);
                    exchange.outcome = Some(Outcome::Lost);
                }
            }
        }

        Ok(Some(exchange))
    }

    /// Record the turn owner published in the room.
    ///
    /// Returns whether ownership changed.
    pub fn set_current_turn(&mut self, owner: PlayerRole) -> bool {
        if !self.is_in_progress() || self.current_turn == owner {
            return false;
        }
        self.current_turn = owner;
        true
    }

    /// Record the opponent's published active index. Returns whether it changed.
    pub fn observe_opponent_active(&mut self, index: usize) -> Result<bool, BattleError> {
        if self.opponent_team.active_index() == index {
            return Ok(false);
        }
        self.opponent_team.set_active(index)?;
        Ok(true)
    }

    /// Apply the HP values the opponent published for their own team
    pub fn sync_opponent_hp(&mut self, records: &[CombatantData]) {
        self.opponent_team.sync_hp(records);
    }

    /// The opponent stayed away past the grace period
    pub fn opponent_disconnected(&mut self) -> Phase {
        if self.is_in_progress() {
            self.phase = Phase::Terminal(Outcome::OpponentDisconnected);
        }
        self.phase
    }
}

fn strike(
    attacker: PlayerRole,
    move_used: &Move,
    attacking: &Team,
    defending: &mut Team,
) -> Result<Exchange, BattleError> {
    let attacker_combatant = attacking.active().ok_or(BattleError::InvalidActiveIndex {
        index: attacking.active_index(),
    })?;
    let defending_index = defending.active_index();
    let defender = defending
        .active_mut()
        .ok_or(BattleError::InvalidActiveIndex {
            index: defending_index,
        })?;

    let resolution = damage::resolve(attacker_combatant, defender, move_used);

    Ok(Exchange {
        attacker,
        attacker_name: attacker_combatant.name.clone(),
        defender_name: defender.name.clone(),
        move_used: move_used.clone(),
        resolution,
        substitution: None,
        pass_turn_to: None,
        outcome: None,
    })
}

#[cfg(test)]
mod tests {
    use pokeduel_protocol::{BaseStats, MoveData};

    use super::*;

    fn record(id: u32, hp: u32, types: &[&str], moves: &[(&str, &str, u32)]) -> CombatantData {
        CombatantData {
            id,
            name: format!("mon-{}", id),
            sprite: String::new(),
            types: types.iter().map(|t| t.to_string()).collect(),
            stats: BaseStats { hp, attack: 50, defense: 50 },
            moves: moves
                .iter()
                .map(|(name, t, power)| MoveData {
                    name: name.to_string(),
                    move_type: t.to_string(),
                    power: *power,
                })
                .collect(),
            current_hp: hp,
            max_hp: hp,
        }
    }

    fn team(hp: u32) -> Vec<CombatantData> {
        (1..=4)
            .map(|id| {
                record(
                    id,
                    hp,
                    &["grass"],
                    &[("Ember", "fire", 40), ("Tackle", "normal", 40), ("Vine Whip", "grass", 45)],
                )
            })
            .collect()
    }

    fn pair(hp: u32) -> (Duel, Duel) {
        let host = Duel::start(PlayerRole::Player1, PlayerRole::Player1, &team(hp), &team(hp)).unwrap();
        let guest = Duel::start(PlayerRole::Player2, PlayerRole::Player1, &team(hp), &team(hp)).unwrap();
        (host, guest)
    }

    #[test]
    fn test_attack_passes_turn_once() {
        let (mut host, mut guest) = pair(100);

        let submission = host.prepare_attack(0).unwrap();
        assert_eq!(submission.seq, 1);
        assert_eq!(host.my_seq(), 0);

        let exchange = host.commit_attack(&submission).unwrap();
        assert_eq!(exchange.resolution.damage, 16);
        assert_eq!(exchange.pass_turn_to, Some(PlayerRole::Player2));
        assert_eq!(host.current_turn(), PlayerRole::Player2);
        assert_eq!(host.opponent_active().unwrap().current_hp(), 84);

        let mirrored = guest.observe_opponent_move(&submission).unwrap().unwrap();
        assert_eq!(mirrored.resolution, exchange.resolution);
        assert_eq!(mirrored.pass_turn_to, None);
        assert_eq!(guest.current_turn(), PlayerRole::Player1);
        assert_eq!(guest.my_active().unwrap().current_hp(), 84);
    }

    #[test]
    fn test_prepare_rejects_out_of_turn_and_bad_index() {
        let (host, guest) = pair(100);
        assert_eq!(
            guest.prepare_attack(0),
            Err(BattleError::NotYourTurn(PlayerRole::Player2))
        );
        assert_eq!(
            host.prepare_attack(7),
            Err(BattleError::MoveIndexOutOfRange { index: 7, available: 3 })
        );
    }

    #[test]
    fn test_commit_rejects_stale_submission() {
        let (mut host, _) = pair(100);
        let mut submission = host.prepare_attack(1).unwrap();
        submission.seq = 5;
        assert_eq!(
            host.commit_attack(&submission),
            Err(BattleError::StaleSubmission { seq: 5 })
        );
        assert_eq!(host.current_turn(), PlayerRole::Player1);
    }

    #[test]
    fn test_duplicate_opponent_submission_ignored() {
        let (mut host, mut guest) = pair(100);
        let submission = host.prepare_attack(1).unwrap();
        host.commit_attack(&submission).unwrap();

        assert!(guest.observe_opponent_move(&submission).unwrap().is_some());
        assert!(guest.observe_opponent_move(&submission).unwrap().is_none());
        assert_eq!(guest.my_active().unwrap().current_hp(), host.opponent_active().unwrap().current_hp());
    }

    #[test]
    fn test_repeated_identical_moves_are_distinct() {
        let (mut host, mut guest) = pair(200);

        for _ in 0..2 {
            let submission = host.prepare_attack(0).unwrap();
            host.commit_attack(&submission).unwrap();
            assert!(guest.observe_opponent_move(&submission).unwrap().is_some());

            assert!(guest.set_current_turn(PlayerRole::Player2));
            let reply = guest.prepare_attack(1).unwrap();
            guest.commit_attack(&reply).unwrap();
            assert!(host.observe_opponent_move(&reply).unwrap().is_some());
            assert!(host.set_current_turn(PlayerRole::Player1));
        }

        assert_eq!(guest.my_active().unwrap().current_hp(), 200 - 16 * 2);
    }

    #[test]
    fn test_out_of_turn_opponent_move_fails_closed() {
        let (mut host, _) = pair(100);
        let submission = MoveSubmission {
            data: MoveData {
                name: "Tackle".into(),
                move_type: "normal".into(),
                power: 40,
            },
            seq: 1,
        };

        let before = host.clone();
        assert_eq!(
            host.observe_opponent_move(&submission),
            Err(BattleError::NotOpponentsTurn(PlayerRole::Player2))
        );
        assert_eq!(host, before);
    }

    #[test]
    fn test_malformed_opponent_move_fails_closed() {
        let (_, mut guest) = pair(100);
        let submission = MoveSubmission {
            data: MoveData {
                name: "???".into(),
                move_type: "cosmic".into(),
                power: 40,
            },
            seq: 1,
        };

        let before = guest.clone();
        assert_eq!(
            guest.observe_opponent_move(&submission),
            Err(BattleError::UnknownType("cosmic".into()))
        );
        assert_eq!(guest, before);
    }

    #[test]
    fn test_faint_substitutes_first_conscious_member() {
        // Ember does 16 to a grass defender; 10 HP faints in one hit
        let (mut host, mut guest) = pair(10);

        let submission = host.prepare_attack(0).unwrap();
        let exchange = host.commit_attack(&submission).unwrap();
        let expected = Some(Substitution { side: PlayerRole::Player2, index: 1 });
        assert_eq!(exchange.substitution, expected);
        assert_eq!(exchange.pass_turn_to, Some(PlayerRole::Player2));
        assert_eq!(host.opponent_team().active_index(), 1);

        let mirrored = guest.observe_opponent_move(&submission).unwrap().unwrap();
        assert_eq!(mirrored.substitution, expected);
        assert_eq!(guest.my_team().active_index(), 1);
        assert_eq!(guest.current_turn(), PlayerRole::Player1);

        // The owner's published index matches the prediction
        assert_eq!(host.observe_opponent_active(1), Ok(false));
    }

    #[test]
    fn test_full_battle_yields_one_winner() {
        let (mut host, mut guest) = pair(60);
        let mut toggles = 0;

        while host.is_in_progress() && guest.is_in_progress() {
            let (attacker, defender) = if host.is_my_turn() {
                (&mut host, &mut guest)
            } else {
                (&mut guest, &mut host)
            };

            let before = attacker.current_turn();
            let submission = attacker.prepare_attack(0).unwrap();
            let exchange = attacker.commit_attack(&submission).unwrap();
            let mirrored = defender.observe_opponent_move(&submission).unwrap().unwrap();
            assert_eq!(mirrored.resolution, exchange.resolution);
            assert_eq!(mirrored.substitution, exchange.substitution);

            if let Some(next) = exchange.pass_turn_to {
                assert_ne!(next, before);
                toggles += 1;
                defender.set_current_turn(next);
            }
            assert_eq!(host.current_turn(), guest.current_turn());
            assert_eq!(host.my_team(), guest.opponent_team());
            assert_eq!(guest.my_team(), host.opponent_team());
        }

        let outcomes = [host.outcome().unwrap(), guest.outcome().unwrap()];
        assert!(outcomes.contains(&Outcome::Won));
        assert!(outcomes.contains(&Outcome::Lost));
        assert!(toggles > 0);
    }

    #[test]
    fn test_set_current_turn_ignored_after_terminal() {
        let (mut host, _) = pair(100);
        assert_eq!(host.opponent_disconnected(), Phase::Terminal(Outcome::OpponentDisconnected));
        assert!(!host.set_current_turn(PlayerRole::Player2));
        assert!(matches!(host.prepare_attack(0), Err(BattleError::NotInProgress(_))));
    }

    #[test]
    fn test_sync_opponent_hp() {
        let (mut host, _) = pair(100);
        let mut reported = team(100);
        reported[0].current_hp = 40;
        host.sync_opponent_hp(&reported);
        assert_eq!(host.opponent_active().unwrap().current_hp(), 40);
    }
}
