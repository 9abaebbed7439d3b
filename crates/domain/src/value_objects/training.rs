//! Skill training levels - the four-tier ordered lattice.
//!
//! `known(0) < trained(1) < plus10(2) < plus20(3)`. The persisted sheet
//! stores three cumulative booleans; a level always maps to a consistent
//! combination (`plus20` implies `plus10` implies `trained`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Ordinal skill proficiency tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TrainingLevel {
    #[default]
    Known,
    Trained,
    Plus10,
    Plus20,
}

impl TrainingLevel {
    /// Ordinal position in the lattice (known = 0 .. plus20 = 3).
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Known => 0,
            Self::Trained => 1,
            Self::Plus10 => 2,
            Self::Plus20 => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Known => "known",
            Self::Trained => "trained",
            Self::Plus10 => "plus10",
            Self::Plus20 => "plus20",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Known => "Known",
            Self::Trained => "Trained",
            Self::Plus10 => "+10",
            Self::Plus20 => "+20",
        }
    }

    /// The cumulative boolean combination this level sets on the sheet.
    pub fn flags(&self) -> TrainingFlags {
        TrainingFlags {
            trained: self.ordinal() >= 1,
            plus10: self.ordinal() >= 2,
            plus20: self.ordinal() >= 3,
        }
    }
}

impl fmt::Display for TrainingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrainingLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "known" => Ok(Self::Known),
            "trained" => Ok(Self::Trained),
            "plus10" | "+10" => Ok(Self::Plus10),
            "plus20" | "+20" => Ok(Self::Plus20),
            _ => Err(DomainError::unknown_key(format!(
                "Unknown training level: '{}'",
                s
            ))),
        }
    }
}

/// The three persisted training booleans for a skill entry.
///
/// Not every combination is reachable through the engine (flags are set
/// cumulatively), but any stored combination still maps to a level: the
/// highest tier whose flag is set wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingFlags {
    pub trained: bool,
    pub plus10: bool,
    pub plus20: bool,
}

impl TrainingFlags {
    pub fn level(&self) -> TrainingLevel {
        if self.plus20 {
            TrainingLevel::Plus20
        } else if self.plus10 {
            TrainingLevel::Plus10
        } else if self.trained {
            TrainingLevel::Trained
        } else {
            TrainingLevel::Known
        }
    }
}

impl From<TrainingLevel> for TrainingFlags {
    fn from(level: TrainingLevel) -> Self {
        level.flags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_strict() {
        assert!(TrainingLevel::Known < TrainingLevel::Trained);
        assert!(TrainingLevel::Trained < TrainingLevel::Plus10);
        assert!(TrainingLevel::Plus10 < TrainingLevel::Plus20);
    }

    #[test]
    fn test_flags_are_cumulative() {
        assert_eq!(
            TrainingLevel::Plus20.flags(),
            TrainingFlags {
                trained: true,
                plus10: true,
                plus20: true
            }
        );
        assert_eq!(
            TrainingLevel::Trained.flags(),
            TrainingFlags {
                trained: true,
                plus10: false,
                plus20: false
            }
        );
        assert_eq!(TrainingLevel::Known.flags(), TrainingFlags::default());
    }

    #[test]
    fn test_flags_round_trip_through_level() {
        for level in [
            TrainingLevel::Known,
            TrainingLevel::Trained,
            TrainingLevel::Plus10,
            TrainingLevel::Plus20,
        ] {
            assert_eq!(level.flags().level(), level);
        }
    }

    #[test]
    fn test_highest_set_flag_wins_for_stored_data() {
        // Hand-edited sheets can carry non-cumulative combinations.
        let flags = TrainingFlags {
            trained: false,
            plus10: true,
            plus20: false,
        };
        assert_eq!(flags.level(), TrainingLevel::Plus10);
    }

    #[test]
    fn test_parse() {
        assert_eq!("plus10".parse::<TrainingLevel>().unwrap(), TrainingLevel::Plus10);
        assert_eq!("+20".parse::<TrainingLevel>().unwrap(), TrainingLevel::Plus20);
        assert!("master".parse::<TrainingLevel>().is_err());
    }
}
