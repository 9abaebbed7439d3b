//! Characteristic value object - the nine core attributes of an actor.
//!
//! Provides type safety for characteristic references instead of magic
//! strings like "toughness" or "ws" scattered through grant configurations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// The nine fixed characteristics.
///
/// Serialized with camelCase keys, matching the persisted sheet layout
/// (`system.characteristics.weaponSkill.advance` etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Characteristic {
    WeaponSkill,
    BallisticSkill,
    Strength,
    Toughness,
    Agility,
    Intelligence,
    Perception,
    Willpower,
    Fellowship,
}

impl Characteristic {
    /// Returns the canonical camelCase key (e.g., "weaponSkill").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeaponSkill => "weaponSkill",
            Self::BallisticSkill => "ballisticSkill",
            Self::Strength => "strength",
            Self::Toughness => "toughness",
            Self::Agility => "agility",
            Self::Intelligence => "intelligence",
            Self::Perception => "perception",
            Self::Willpower => "willpower",
            Self::Fellowship => "fellowship",
        }
    }

    /// Returns the full display name (e.g., "Weapon Skill").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WeaponSkill => "Weapon Skill",
            Self::BallisticSkill => "Ballistic Skill",
            Self::Strength => "Strength",
            Self::Toughness => "Toughness",
            Self::Agility => "Agility",
            Self::Intelligence => "Intelligence",
            Self::Perception => "Perception",
            Self::Willpower => "Willpower",
            Self::Fellowship => "Fellowship",
        }
    }

    /// Short abbreviation used on sheets and in formulas ("ws", "tb" minus
    /// the trailing 'b').
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::WeaponSkill => "ws",
            Self::BallisticSkill => "bs",
            Self::Strength => "s",
            Self::Toughness => "t",
            Self::Agility => "ag",
            Self::Intelligence => "int",
            Self::Perception => "per",
            Self::Willpower => "wp",
            Self::Fellowship => "fel",
        }
    }

    /// Short bonus token accepted by resource formulas ("tb", "wsb", ...).
    pub fn bonus_token(&self) -> String {
        format!("{}b", self.abbreviation())
    }

    /// Long bonus token accepted by resource formulas ("toughness-bonus").
    pub fn long_bonus_token(&self) -> String {
        let mut out = String::new();
        for (i, ch) in self.as_str().chars().enumerate() {
            if ch.is_ascii_uppercase() {
                if i > 0 {
                    out.push('-');
                }
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out.push_str("-bonus");
        out
    }

    /// Returns all nine characteristics in sheet order.
    pub fn all() -> [Characteristic; 9] {
        [
            Self::WeaponSkill,
            Self::BallisticSkill,
            Self::Strength,
            Self::Toughness,
            Self::Agility,
            Self::Intelligence,
            Self::Perception,
            Self::Willpower,
            Self::Fellowship,
        ]
    }

    /// Resolves a bonus token ("tb" or "toughness-bonus") to a characteristic.
    pub fn from_bonus_token(token: &str) -> Option<Characteristic> {
        let token = token.to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|c| c.bonus_token() == token || c.long_bonus_token() == token)
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "ws" | "weaponskill" => Ok(Self::WeaponSkill),
            "bs" | "ballisticskill" => Ok(Self::BallisticSkill),
            "s" | "str" | "strength" => Ok(Self::Strength),
            "t" | "tgh" | "toughness" => Ok(Self::Toughness),
            "ag" | "agi" | "agility" => Ok(Self::Agility),
            "int" | "intelligence" => Ok(Self::Intelligence),
            "per" | "perception" => Ok(Self::Perception),
            "wp" | "wil" | "willpower" => Ok(Self::Willpower),
            "fel" | "fellowship" => Ok(Self::Fellowship),
            _ => Err(DomainError::unknown_key(format!(
                "Unknown characteristic key: '{}'",
                s
            ))),
        }
    }
}

/// A characteristic's numeric state on an actor.
///
/// `base` is the rolled/bought starting value; `advance` is the counter the
/// grant engine adds to. The effective total is `base + advance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicState {
    pub base: i32,
    pub advance: i32,
}

impl CharacteristicState {
    pub fn new(base: i32) -> Self {
        Self { base, advance: 0 }
    }

    pub fn total(&self) -> i32 {
        self.base + self.advance
    }

    /// Characteristic bonus: the tens digit of the total.
    pub fn bonus(&self) -> i32 {
        self.total() / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_key() {
        assert_eq!(
            "weaponSkill".parse::<Characteristic>().unwrap(),
            Characteristic::WeaponSkill
        );
        assert_eq!(
            "toughness".parse::<Characteristic>().unwrap(),
            Characteristic::Toughness
        );
    }

    #[test]
    fn test_parse_is_case_and_separator_insensitive() {
        assert_eq!(
            "Weapon Skill".parse::<Characteristic>().unwrap(),
            Characteristic::WeaponSkill
        );
        assert_eq!(
            "ballistic-skill".parse::<Characteristic>().unwrap(),
            Characteristic::BallisticSkill
        );
        assert_eq!(
            "WS".parse::<Characteristic>().unwrap(),
            Characteristic::WeaponSkill
        );
    }

    #[test]
    fn test_parse_unknown_key_is_error() {
        assert!(matches!(
            "sanity".parse::<Characteristic>(),
            Err(DomainError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_bonus_tokens() {
        assert_eq!(Characteristic::Toughness.bonus_token(), "tb");
        assert_eq!(Characteristic::WeaponSkill.bonus_token(), "wsb");
        assert_eq!(
            Characteristic::Toughness.long_bonus_token(),
            "toughness-bonus"
        );
        assert_eq!(
            Characteristic::WeaponSkill.long_bonus_token(),
            "weapon-skill-bonus"
        );
    }

    #[test]
    fn test_from_bonus_token() {
        assert_eq!(
            Characteristic::from_bonus_token("tb"),
            Some(Characteristic::Toughness)
        );
        assert_eq!(
            Characteristic::from_bonus_token("willpower-bonus"),
            Some(Characteristic::Willpower)
        );
        assert_eq!(Characteristic::from_bonus_token("xyz"), None);
    }

    #[test]
    fn test_state_total_and_bonus() {
        let state = CharacteristicState {
            base: 32,
            advance: 10,
        };
        assert_eq!(state.total(), 42);
        assert_eq!(state.bonus(), 4);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_string(&Characteristic::WeaponSkill).unwrap();
        assert_eq!(json, "\"weaponSkill\"");
    }
}
