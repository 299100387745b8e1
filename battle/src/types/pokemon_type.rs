//! Elemental types and the effectiveness chart

/// The 18 elemental types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Type {
    Normal = 0,
    Fire = 1,
    Water = 2,
    Electric = 3,
    Grass = 4,
    Ice = 5,
    Fighting = 6,
    Poison = 7,
    Ground = 8,
    Flying = 9,
    Psychic = 10,
    Bug = 11,
    Rock = 12,
    Ghost = 13,
    Dragon = 14,
    Dark = 15,
    Steel = 16,
    Fairy = 17,
}

use Type::*;

impl Type {
    pub const ALL: [Type; 18] = [
        Normal, Fire, Water, Electric, Grass, Ice, Fighting, Poison, Ground, Flying, Psychic, Bug,
        Rock, Ghost, Dragon, Dark, Steel, Fairy,
    ];

    pub fn all() -> &'static [Type] {
        &Self::ALL
    }

    /// Defending types a move of this type hits for double damage
    pub fn strong_against(&self) -> &'static [Type] {
        match self {
            Normal => &[],
            Fire => &[Grass, Ice, Bug, Steel],
            Water => &[Fire, Ground, Rock],
            Grass => &[Water, Ground, Rock],
            Electric => &[Water, Flying],
            Ice => &[Grass, Ground, Flying, Dragon],
            Fighting => &[Normal, Ice, Rock, Dark, Steel],
            Poison => &[Grass, Fairy],
            Ground => &[Fire, Electric, Poison, Rock, Steel],
            Flying => &[Grass, Fighting, Bug],
            Psychic => &[Fighting, Poison],
            Bug => &[Grass, Psychic, Dark],
            Rock => &[Fire, Ice, Flying, Bug],
            Ghost => &[Psychic, Ghost],
            Dragon => &[Dragon],
            Dark => &[Psychic, Ghost],
            Steel => &[Ice, Rock, Fairy],
            Fairy => &[Fighting, Dragon, Dark],
        }
    }

    /// Defending types a move of this type hits for half damage
    pub fn weak_against(&self) -> &'static [Type] {
        match self {
            Normal => &[],
            Fire => &[Water, Rock, Ground],
            Water => &[Electric, Grass],
            Grass => &[Fire, Ice, Poison, Flying, Bug],
            Electric => &[Ground],
            Ice => &[Fire, Fighting, Rock, Steel],
            Fighting => &[Flying, Psychic, Fairy],
            Poison => &[Ground, Psychic],
            Ground => &[Water, Grass, Ice],
            Flying => &[Electric, Ice, Rock],
            Psychic => &[Bug, Ghost, Dark],
            Bug => &[Fire, Flying, Rock],
            Rock => &[Water, Grass, Fighting, Ground, Steel],
            Ghost => &[Ghost, Dark],
            Dragon => &[Ice, Dragon, Fairy],
            Dark => &[Fighting, Bug, Fairy],
            Steel => &[Fire, Fighting, Ground],
            Fairy => &[Poison, Steel],
        }
    }

    /// Multiplier against a single defending type.
    ///
    /// A type listed in both sets (ghost against ghost) nets out to 1.
    pub fn effectiveness(&self, defender: Type) -> f64 {
        let mut multiplier = 1.0;
        if self.strong_against().contains(&defender) {
            multiplier *= 2.0;
        }
        if self.weak_against().contains(&defender) {
            multiplier *= 0.5;
        }
        multiplier
    }

    /// Multiplier against every defending type, compounded
    pub fn effectiveness_multi(&self, defenders: &[Type]) -> f64 {
        defenders.iter().map(|t| self.effectiveness(*t)).product()
    }

    /// Parse from the lowercase document name (case-insensitive)
    pub fn from_protocol(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Normal),
            "fire" => Some(Fire),
            "water" => Some(Water),
            "electric" => Some(Electric),
            "grass" => Some(Grass),
            "ice" => Some(Ice),
            "fighting" => Some(Fighting),
            "poison" => Some(Poison),
            "ground" => Some(Ground),
            "flying" => Some(Flying),
            "psychic" => Some(Psychic),
            "bug" => Some(Bug),
            "rock" => Some(Rock),
            "ghost" => Some(Ghost),
            "dragon" => Some(Dragon),
            "dark" => Some(Dark),
            "steel" => Some(Steel),
            "fairy" => Some(Fairy),
            _ => None,
        }
    }

    /// Name as written into the shared document
    pub fn as_protocol(&self) -> &'static str {
        match self {
            Normal => "normal",
            Fire => "fire",
            Water => "water",
            Electric => "electric",
            Grass => "grass",
            Ice => "ice",
            Fighting => "fighting",
            Poison => "poison",
            Ground => "ground",
            Flying => "flying",
            Psychic => "psychic",
            Bug => "bug",
            Rock => "rock",
            Ghost => "ghost",
            Dragon => "dragon",
            Dark => "dark",
            Steel => "steel",
            Fairy => "fairy",
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_protocol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_effectiveness_super_effective() {
        assert_eq!(Fire.effectiveness(Grass), 2.0);
        assert_eq!(Water.effectiveness(Fire), 2.0);
        assert_eq!(Electric.effectiveness(Water), 2.0);
        assert_eq!(Fighting.effectiveness(Normal), 2.0);
    }

    #[test]
    fn test_type_effectiveness_not_very_effective() {
        assert_eq!(Fire.effectiveness(Water), 0.5);
        assert_eq!(Grass.effectiveness(Fire), 0.5);
        assert_eq!(Fire.effectiveness(Ground), 0.5);
    }

    #[test]
    fn test_normal_is_always_neutral() {
        for t in Type::all() {
            assert_eq!(Normal.effectiveness(*t), 1.0);
        }
    }

    #[test]
    fn test_ghost_against_ghost_cancels_out() {
        assert_eq!(Ghost.effectiveness(Ghost), 1.0);
        assert_eq!(Dragon.effectiveness(Dragon), 1.0);
    }

    #[test]
    fn test_no_immunities_in_chart() {
        assert_eq!(Electric.effectiveness(Ground), 0.5);
        assert_eq!(Ghost.effectiveness(Normal), 1.0);
    }

    #[test]
    fn test_type_effectiveness_multi() {
        assert_eq!(Fire.effectiveness_multi(&[Grass, Steel]), 4.0);
        assert_eq!(Fire.effectiveness_multi(&[Water, Rock]), 0.25);
        assert_eq!(Ice.effectiveness_multi(&[Grass, Fire]), 1.0);
        assert_eq!(Fire.effectiveness_multi(&[]), 1.0);
    }

    #[test]
    fn test_multiplier_set_for_single_and_dual_defenders() {
        let allowed = [0.25, 0.5, 1.0, 2.0, 4.0];
        for attacker in Type::all() {
            for first in Type::all() {
                let single = attacker.effectiveness_multi(&[*first]);
                assert!(allowed.contains(&single), "{attacker} vs {first}: {single}");

                for second in Type::all() {
                    let dual = attacker.effectiveness_multi(&[*first, *second]);
                    assert!(allowed.contains(&dual), "{attacker} vs {first}/{second}: {dual}");
                }
            }
        }
    }

    #[test]
    fn test_order_independent() {
        for attacker in Type::all() {
            assert_eq!(
                attacker.effectiveness_multi(&[Water, Flying]),
                attacker.effectiveness_multi(&[Flying, Water])
            );
        }
    }

    #[test]
    fn test_type_from_protocol() {
        assert_eq!(Type::from_protocol("fire"), Some(Fire));
        assert_eq!(Type::from_protocol("FIRE"), Some(Fire));
        assert_eq!(Type::from_protocol("Psychic"), Some(Psychic));
        assert_eq!(Type::from_protocol("shadow"), None);
    }

    #[test]
    fn test_protocol_names_round_trip() {
        for t in Type::all() {
            assert_eq!(Type::from_protocol(t.as_protocol()), Some(*t));
        }
        assert_eq!(Type::all().len(), 18);
    }
}
