//! Application records - the mutable half of a grant, kept apart from the
//! immutable configuration.
//!
//! An `AppliedState` is produced per `apply()` call and fully determines
//! what `reverse()` must undo. A `RestoreData` is produced by `reverse()`
//! and is sufficient to `restore()` later. Both are serializable so callers
//! can persist them alongside the actor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::OwnedEntity;
use crate::ids::EntityId;
use crate::value_objects::{SkillKey, TrainingLevel};

/// What a single grant's apply call did, keyed by a variant-specific sub-key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "lowercase")]
pub enum AppliedState {
    /// Created-entity ids keyed by the original reference id
    Item(BTreeMap<String, EntityId>),
    /// Per-skill application records keyed by the configured skill key
    Skill(BTreeMap<String, SkillApplied>),
    /// Per-characteristic deltas keyed by the canonical characteristic key
    Characteristic(BTreeMap<String, CharacteristicApplied>),
    /// Per-resource additions keyed by the resource type
    Resource(BTreeMap<String, ResourceApplied>),
    Choice(ChoiceApplied),
}

impl AppliedState {
    /// Whether the apply call recorded anything at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Item(map) => map.is_empty(),
            Self::Skill(map) => map.is_empty(),
            Self::Characteristic(map) => map.is_empty(),
            Self::Resource(map) => map.is_empty(),
            Self::Choice(choice) => choice.grant_results.is_empty(),
        }
    }

    /// Number of recorded sub-entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Item(map) => map.len(),
            Self::Skill(map) => map.len(),
            Self::Characteristic(map) => map.len(),
            Self::Resource(map) => map.len(),
            Self::Choice(choice) => choice.grant_results.len(),
        }
    }
}

/// How a skill grant changed one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillApplied {
    /// Canonical schema key the free-text key resolved to
    pub schema_key: SkillKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    /// Index of the specialization entry that was touched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,
    pub previous_level: TrainingLevel,
    pub new_level: TrainingLevel,
    pub change: SkillChange,
}

/// Whether a skill application upgraded an existing entry or created one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillChange {
    Upgraded,
    Created,
}

/// Exact numeric record for a characteristic advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicApplied {
    pub previous_value: i32,
    pub applied_value: i32,
    pub new_value: i32,
}

/// Exact record for a resource addition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceApplied {
    pub formula: String,
    pub rolled_value: i32,
    pub previous_value: i32,
}

/// What a choice grant's apply call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceApplied {
    pub selected_options: Vec<String>,
    /// Nested applied state per "optionLabel:index" selection, keyed inside
    /// by the nested grant id
    pub grant_results: BTreeMap<String, BTreeMap<String, AppliedState>>,
}

/// Key for one selection's results: `"optionLabel:index"`.
pub fn selection_key(label: &str, index: usize) -> String {
    format!("{}:{}", label, index)
}

/// Serializable package produced by `reverse()`, sufficient to `restore()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "state", rename_all = "lowercase")]
pub enum RestoreData {
    /// Snapshots of the deleted entities, recreated verbatim on restore
    Item(Vec<OwnedEntity>),
    /// The skill records to re-establish
    Skill(BTreeMap<String, SkillApplied>),
    /// The deltas to re-add, keyed by characteristic key
    Characteristic(BTreeMap<String, i32>),
    /// The rolled values to re-add, keyed by resource type
    Resource(BTreeMap<String, ResourceRestore>),
    Choice(ChoiceRestore),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRestore {
    pub formula: String,
    pub rolled_value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRestore {
    pub selected_options: Vec<String>,
    /// Nested restore data per "optionLabel:index" selection, keyed inside
    /// by the nested grant id
    pub grants: BTreeMap<String, BTreeMap<String, RestoreData>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_key_shape() {
        assert_eq!(selection_key("Sororitas Training", 0), "Sororitas Training:0");
    }

    #[test]
    fn test_applied_state_emptiness() {
        let empty = AppliedState::Characteristic(BTreeMap::new());
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let mut map = BTreeMap::new();
        map.insert(
            "toughness".to_string(),
            CharacteristicApplied {
                previous_value: 0,
                applied_value: 2,
                new_value: 2,
            },
        );
        let state = AppliedState::Characteristic(map);
        assert!(!state.is_empty());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_applied_state_serde_round_trip() {
        let mut map = BTreeMap::new();
        map.insert(
            "dodge".to_string(),
            SkillApplied {
                schema_key: SkillKey::Dodge,
                specialization: None,
                entry_index: None,
                previous_level: TrainingLevel::Known,
                new_level: TrainingLevel::Trained,
                change: SkillChange::Upgraded,
            },
        );
        let state = AppliedState::Skill(map);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "skill");
        let back: AppliedState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_choice_applied_nests_states() {
        let mut inner = BTreeMap::new();
        inner.insert(
            uuid::Uuid::new_v4().to_string(),
            AppliedState::Resource(BTreeMap::new()),
        );
        let mut results = BTreeMap::new();
        results.insert(selection_key("A", 0), inner);
        let state = AppliedState::Choice(ChoiceApplied {
            selected_options: vec!["A".to_string()],
            grant_results: results,
        });
        let json = serde_json::to_string(&state).unwrap();
        let back: AppliedState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
