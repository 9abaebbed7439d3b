//! Skill keys and per-actor skill state.
//!
//! Free-text skill references in grant configurations ("Tech Use",
//! "common-lore", "sleight of hand") are resolved through an exhaustive
//! compile-time alias table to a canonical schema key. Resolution failure is
//! a hard validation error, never a silent fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::value_objects::{TrainingFlags, TrainingLevel};

/// Canonical schema key for every skill the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillKey {
    Acrobatics,
    Athletics,
    Awareness,
    Charm,
    Command,
    Commerce,
    CommonLore,
    Deceive,
    Dodge,
    ForbiddenLore,
    Inquiry,
    Interrogation,
    Intimidate,
    Linguistics,
    Logic,
    Medicae,
    Navigate,
    Operate,
    Parry,
    Psyniscience,
    ScholasticLore,
    Scrutiny,
    Security,
    SleightOfHand,
    Stealth,
    Survival,
    TechUse,
    Trade,
}

impl SkillKey {
    /// Returns the canonical camelCase schema key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acrobatics => "acrobatics",
            Self::Athletics => "athletics",
            Self::Awareness => "awareness",
            Self::Charm => "charm",
            Self::Command => "command",
            Self::Commerce => "commerce",
            Self::CommonLore => "commonLore",
            Self::Deceive => "deceive",
            Self::Dodge => "dodge",
            Self::ForbiddenLore => "forbiddenLore",
            Self::Inquiry => "inquiry",
            Self::Interrogation => "interrogation",
            Self::Intimidate => "intimidate",
            Self::Linguistics => "linguistics",
            Self::Logic => "logic",
            Self::Medicae => "medicae",
            Self::Navigate => "navigate",
            Self::Operate => "operate",
            Self::Parry => "parry",
            Self::Psyniscience => "psyniscience",
            Self::ScholasticLore => "scholasticLore",
            Self::Scrutiny => "scrutiny",
            Self::Security => "security",
            Self::SleightOfHand => "sleightOfHand",
            Self::Stealth => "stealth",
            Self::Survival => "survival",
            Self::TechUse => "techUse",
            Self::Trade => "trade",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Acrobatics => "Acrobatics",
            Self::Athletics => "Athletics",
            Self::Awareness => "Awareness",
            Self::Charm => "Charm",
            Self::Command => "Command",
            Self::Commerce => "Commerce",
            Self::CommonLore => "Common Lore",
            Self::Deceive => "Deceive",
            Self::Dodge => "Dodge",
            Self::ForbiddenLore => "Forbidden Lore",
            Self::Inquiry => "Inquiry",
            Self::Interrogation => "Interrogation",
            Self::Intimidate => "Intimidate",
            Self::Linguistics => "Linguistics",
            Self::Logic => "Logic",
            Self::Medicae => "Medicae",
            Self::Navigate => "Navigate",
            Self::Operate => "Operate",
            Self::Parry => "Parry",
            Self::Psyniscience => "Psyniscience",
            Self::ScholasticLore => "Scholastic Lore",
            Self::Scrutiny => "Scrutiny",
            Self::Security => "Security",
            Self::SleightOfHand => "Sleight of Hand",
            Self::Stealth => "Stealth",
            Self::Survival => "Survival",
            Self::TechUse => "Tech-Use",
            Self::Trade => "Trade",
        }
    }

    /// Specialist skills track independently-trained named specializations.
    pub fn is_specialist(&self) -> bool {
        matches!(
            self,
            Self::CommonLore
                | Self::ForbiddenLore
                | Self::ScholasticLore
                | Self::Linguistics
                | Self::Navigate
                | Self::Operate
                | Self::Trade
        )
    }

    /// Resolves a free-text key through the alias table.
    ///
    /// Matching is case-, hyphen-, and space-insensitive: the input is
    /// stripped to lowercase alphanumerics before lookup.
    pub fn resolve(input: &str) -> Result<SkillKey, DomainError> {
        let normalized: String = input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "acrobatics" => Ok(Self::Acrobatics),
            "athletics" => Ok(Self::Athletics),
            "awareness" => Ok(Self::Awareness),
            "charm" => Ok(Self::Charm),
            "command" => Ok(Self::Command),
            "commerce" | "barter" => Ok(Self::Commerce),
            "commonlore" => Ok(Self::CommonLore),
            "deceive" | "deception" => Ok(Self::Deceive),
            "dodge" => Ok(Self::Dodge),
            "forbiddenlore" => Ok(Self::ForbiddenLore),
            "inquiry" => Ok(Self::Inquiry),
            "interrogation" => Ok(Self::Interrogation),
            "intimidate" | "intimidation" => Ok(Self::Intimidate),
            "linguistics" | "speaklanguage" => Ok(Self::Linguistics),
            "logic" => Ok(Self::Logic),
            "medicae" | "medic" => Ok(Self::Medicae),
            "navigate" | "navigation" => Ok(Self::Navigate),
            "operate" | "drive" | "pilot" => Ok(Self::Operate),
            "parry" => Ok(Self::Parry),
            "psyniscience" => Ok(Self::Psyniscience),
            "scholasticlore" => Ok(Self::ScholasticLore),
            "scrutiny" => Ok(Self::Scrutiny),
            "security" => Ok(Self::Security),
            "sleightofhand" | "legerdemain" => Ok(Self::SleightOfHand),
            "stealth" | "sneak" => Ok(Self::Stealth),
            "survival" | "wrangling" => Ok(Self::Survival),
            "techuse" => Ok(Self::TechUse),
            "trade" => Ok(Self::Trade),
            _ => Err(DomainError::unknown_key(format!(
                "Unknown skill key: '{}'",
                input
            ))),
        }
    }
}

impl fmt::Display for SkillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SkillKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// One named specialization entry on a specialist skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecializationEntry {
    pub name: String,
    #[serde(flatten)]
    pub flags: TrainingFlags,
}

impl SpecializationEntry {
    pub fn new(name: impl Into<String>, level: TrainingLevel) -> Self {
        Self {
            name: name.into(),
            flags: level.flags(),
        }
    }

    /// Case-insensitive name match, the way sheet data is looked up.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// The persisted skill state on an actor.
///
/// Simple skills hold one set of training flags; specialist skills hold a
/// list of per-specialization sub-entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillState {
    Specialist(Vec<SpecializationEntry>),
    Simple(TrainingFlags),
}

impl SkillState {
    /// Current level of a simple skill, or of the named specialization.
    pub fn level(&self, specialization: Option<&str>) -> Option<TrainingLevel> {
        match (self, specialization) {
            (Self::Simple(flags), _) => Some(flags.level()),
            (Self::Specialist(entries), Some(name)) => entries
                .iter()
                .find(|e| e.matches(name))
                .map(|e| e.flags.level()),
            (Self::Specialist(_), None) => None,
        }
    }

    /// Index of the named specialization entry, if present.
    pub fn specialization_index(&self, name: &str) -> Option<usize> {
        match self {
            Self::Specialist(entries) => entries.iter().position(|e| e.matches(name)),
            Self::Simple(_) => None,
        }
    }
}
