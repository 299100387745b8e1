//! One player's team

use pokeduel_protocol::CombatantData;

use super::combatant::Combatant;
use crate::BattleError;

/// A player's combatants in party order plus the index of the one on the field.
///
/// Fainted members stay in the team with zero HP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    members: Vec<Combatant>,
    active: usize,
}

impl Team {
    /// Create a team with the first member active
    pub fn new(members: Vec<Combatant>) -> Self {
        Self { members, active: 0 }
    }

    /// Rebuild a team from a slot's `team` and `activePokemonIndex`
    pub fn from_protocol(records: &[CombatantData], active: usize) -> Result<Self, BattleError> {
        let members = records
            .iter()
            .map(Combatant::from_protocol)
            .collect::<Result<Vec<_>, _>>()?;

        if active >= members.len() {
            return Err(BattleError::InvalidActiveIndex { index: active });
        }

        Ok(Self { members, active })
    }

    pub fn to_protocol(&self) -> Vec<CombatantData> {
        self.members.iter().map(Combatant::to_protocol).collect()
    }

    pub fn members(&self) -> &[Combatant] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Combatant> {
        self.members.get(index)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&Combatant> {
        self.members.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Combatant> {
        self.members.get_mut(self.active)
    }

    /// Put a conscious member on the field
    pub fn set_active(&mut self, index: usize) -> Result<(), BattleError> {
        match self.members.get(index) {
            Some(member) if member.is_alive() => {
                self.active = index;
                Ok(())
            }
            _ => Err(BattleError::InvalidActiveIndex { index }),
        }
    }

    /// First member in party order that can still fight
    pub fn next_alive(&self) -> Option<usize> {
        self.members.iter().position(Combatant::is_alive)
    }

    pub fn alive_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_alive()).count()
    }

    pub fn fainted_count(&self) -> usize {
        self.members.len() - self.alive_count()
    }

    pub fn is_defeated(&self) -> bool {
        self.alive_count() == 0
    }

    /// Apply HP values reported by the team's owner.
    ///
    /// Values are only ever lowered, so a late report can't undo damage
    /// that was already resolved locally.
    pub fn sync_hp(&mut self, records: &[CombatantData]) {
        for (member, record) in self.members.iter_mut().zip(records) {
            member.lower_hp_to(record.current_hp);
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
    fn test_from_protocol_keeps_active_index() {
        let team = Team::from_protocol(&[record(1, 50), record(2, 50)], 1).unwrap();
        assert_eq!(team.active_index(), 1);
        assert_eq!(team.active().unwrap().id, 2);
    }

    #[test]
    fn test_from_protocol_rejects_out_of_range_active() {
        assert_eq!(
            Team::from_protocol(&[record(1, 50)], 1),
            Err(BattleError::InvalidActiveIndex { index: 1 })
        );
    }

    #[test]
    fn test_next_alive_is_first_in_party_order() {
        let team = Team::from_protocol(&[record(1, 0), record(2, 0), record(3, 10), record(4, 5)], 0)
            .unwrap();
        assert_eq!(team.next_alive(), Some(2));
        assert_eq!(team.alive_count(), 2);
        assert_eq!(team.fainted_count(), 2);
    }

    #[test]
    fn test_defeated() {
        let team = Team::from_protocol(&[record(1, 0), record(2, 0)], 1).unwrap();
        assert!(team.is_defeated());
        assert_eq!(team.next_alive(), None);
    }

    #[test]
    fn test_set_active_requires_conscious_member() {
        let mut team = Team::from_protocol(&[record(1, 0), record(2, 30)], 0).unwrap();
        assert!(team.set_active(0).is_err());
        assert!(team.set_active(5).is_err());
        team.set_active(1).unwrap();
        assert_eq!(team.active_index(), 1);
    }

    #[test]
    fn test_sync_hp_only_lowers() {
        let mut team = Team::from_protocol(&[record(1, 30), record(2, 50)], 0).unwrap();
        team.sync_hp(&[record(1, 40), record(2, 20)]);
        assert_eq!(team.get(0).unwrap().current_hp(), 30);
        assert_eq!(team.get(1).unwrap().current_hp(), 20);
    }
}
