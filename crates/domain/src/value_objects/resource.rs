//! Pool resource value objects - wounds, fate, corruption, insanity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// The four pool resources a resource grant can add to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Wounds,
    Fate,
    Corruption,
    Insanity,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wounds => "wounds",
            Self::Fate => "fate",
            Self::Corruption => "corruption",
            Self::Insanity => "insanity",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Wounds => "Wounds",
            Self::Fate => "Fate",
            Self::Corruption => "Corruption",
            Self::Insanity => "Insanity",
        }
    }

    /// Whether adding to this resource also raises its maximum.
    ///
    /// Wounds and fate are capacity pools: a grant permanently enlarges them.
    /// Corruption and insanity accumulate against a fixed threshold.
    pub fn affects_maximum(&self) -> bool {
        matches!(self, Self::Wounds | Self::Fate)
    }

    pub fn all() -> [ResourceType; 4] {
        [Self::Wounds, Self::Fate, Self::Corruption, Self::Insanity]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wounds" => Ok(Self::Wounds),
            "fate" => Ok(Self::Fate),
            "corruption" => Ok(Self::Corruption),
            "insanity" => Ok(Self::Insanity),
            _ => Err(DomainError::unknown_key(format!(
                "Unknown resource type: '{}'",
                s
            ))),
        }
    }
}

/// A pool resource on an actor: current value and maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePool {
    pub value: i32,
    pub maximum: i32,
}

impl ResourcePool {
    pub fn new(value: i32, maximum: i32) -> Self {
        Self { value, maximum }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_types() {
        assert_eq!("wounds".parse::<ResourceType>().unwrap(), ResourceType::Wounds);
        assert_eq!("Fate".parse::<ResourceType>().unwrap(), ResourceType::Fate);
        assert!(matches!(
            "mana".parse::<ResourceType>(),
            Err(DomainError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_affects_maximum() {
        assert!(ResourceType::Wounds.affects_maximum());
        assert!(ResourceType::Fate.affects_maximum());
        assert!(!ResourceType::Corruption.affects_maximum());
        assert!(!ResourceType::Insanity.affects_maximum());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ResourceType::Insanity).unwrap();
        assert_eq!(json, "\"insanity\"");
    }
}
