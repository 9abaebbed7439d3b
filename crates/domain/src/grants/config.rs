//! Grant configuration - the immutable half of a grant.
//!
//! A `GrantConfig` is authored once on a source item (or produced by legacy
//! migration) and is thereafter read-only. What happened at apply time lives
//! in the separate application record (`applied` module); configuration and
//! application state never share a schema.
//!
//! Wire format: each element of the persisted grant array is
//! `{id, type, optional, label?, hint?, ...type-specific fields}` with
//! `type` in {item, skill, characteristic, resource, choice}.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::ids::GrantId;
use crate::value_objects::{Characteristic, ResourceFormula, ResourceType, SkillKey, TrainingLevel};

/// A configured benefit that can be applied to an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantConfig {
    pub id: GrantId,
    /// Whether the whole grant can be skipped by the player
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(flatten)]
    pub kind: GrantKind,
}

/// The variant-specific configuration, discriminated by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GrantKind {
    Item(ItemGrantConfig),
    Skill(SkillGrantConfig),
    Characteristic(CharacteristicGrantConfig),
    Resource(ResourceGrantConfig),
    Choice(ChoiceGrantConfig),
}

impl GrantConfig {
    pub fn new(kind: GrantKind) -> Self {
        Self {
            id: GrantId::new(),
            optional: false,
            label: None,
            hint: None,
            kind,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// The wire discriminant for this grant's variant.
    pub fn type_tag(&self) -> &'static str {
        match &self.kind {
            GrantKind::Item(_) => "item",
            GrantKind::Skill(_) => "skill",
            GrantKind::Characteristic(_) => "characteristic",
            GrantKind::Resource(_) => "resource",
            GrantKind::Choice(_) => "choice",
        }
    }

    /// Structural validation of the configuration, independent of any actor.
    pub fn validate(&self) -> Vec<String> {
        match &self.kind {
            GrantKind::Item(config) => config.validate(),
            GrantKind::Skill(config) => config.validate(),
            GrantKind::Characteristic(config) => config.validate(),
            GrantKind::Resource(config) => config.validate(),
            GrantKind::Choice(config) => config.validate(),
        }
    }

    /// Read-only summary for preview/disclosure surfaces.
    pub fn summary(&self) -> GrantSummary {
        let (icon, default_label, details) = match &self.kind {
            GrantKind::Item(config) => ("fa-box-open", "Item Grant", config.details()),
            GrantKind::Skill(config) => ("fa-book", "Skill Grant", config.details()),
            GrantKind::Characteristic(config) => {
                ("fa-arrow-up", "Characteristic Grant", config.details())
            }
            GrantKind::Resource(config) => ("fa-heart", "Resource Grant", config.details()),
            GrantKind::Choice(config) => ("fa-list-check", "Choice", config.details()),
        };
        GrantSummary {
            type_tag: self.type_tag(),
            label: self
                .label
                .clone()
                .unwrap_or_else(|| default_label.to_string()),
            icon,
            details,
        }
    }
}

/// Read-only preview of a grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSummary {
    pub type_tag: &'static str,
    pub label: String,
    pub icon: &'static str,
    pub details: Vec<String>,
}

// ===========================================================================
// Item
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrantConfig {
    pub items: Vec<ItemGrantEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrantEntry {
    /// Stable reference id of the item template. Empty references are
    /// legacy-migration placeholders and are skipped at apply time.
    pub uuid: String,
    #[serde(default)]
    pub optional: bool,
    /// Per-entry data deep-merged over the resolved template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Value>,
}

impl ItemGrantConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.items.is_empty() {
            errors.push("Item grant has no item entries".to_string());
        }
        errors
    }

    fn details(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|entry| {
                let name = entry
                    .overrides
                    .as_ref()
                    .and_then(|o| o.get("name"))
                    .and_then(Value::as_str);
                match name {
                    Some(name) => name.to_string(),
                    None if entry.uuid.is_empty() => "(unresolved legacy entry)".to_string(),
                    None => entry.uuid.clone(),
                }
            })
            .collect()
    }
}

// ===========================================================================
// Skill
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGrantConfig {
    pub skills: Vec<SkillGrantEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGrantEntry {
    /// Free-text skill key, resolved through the canonical alias table
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    pub level: TrainingLevel,
    #[serde(default)]
    pub optional: bool,
}

impl SkillGrantConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.skills.is_empty() {
            errors.push("Skill grant has no skill entries".to_string());
        }
        for entry in &self.skills {
            match SkillKey::resolve(&entry.key) {
                Ok(key) => {
                    if key.is_specialist() && entry.specialization.is_none() {
                        errors.push(format!(
                            "Specialist skill '{}' requires a specialization",
                            entry.key
                        ));
                    }
                    if !key.is_specialist() && entry.specialization.is_some() {
                        errors.push(format!(
                            "Skill '{}' does not take a specialization",
                            entry.key
                        ));
                    }
                }
                Err(e) => errors.push(e.to_string()),
            }
        }
        errors
    }

    fn details(&self) -> Vec<String> {
        self.skills
            .iter()
            .map(|entry| {
                let name = SkillKey::resolve(&entry.key)
                    .map(|k| k.display_name().to_string())
                    .unwrap_or_else(|_| entry.key.clone());
                match &entry.specialization {
                    Some(spec) => format!("{} ({}) {}", name, spec, entry.level.display_name()),
                    None => format!("{} {}", name, entry.level.display_name()),
                }
            })
            .collect()
    }
}

// ===========================================================================
// Characteristic
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicGrantConfig {
    pub characteristics: Vec<CharacteristicGrantEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicGrantEntry {
    /// Characteristic key, one of the nine canonical keys
    pub key: String,
    /// Signed delta added to the characteristic's advance counter
    pub value: i32,
    #[serde(default)]
    pub optional: bool,
}

impl CharacteristicGrantConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.characteristics.is_empty() {
            errors.push("Characteristic grant has no entries".to_string());
        }
        for entry in &self.characteristics {
            if let Err(e) = Characteristic::from_str(&entry.key) {
                errors.push(e.to_string());
            }
        }
        errors
    }

    fn details(&self) -> Vec<String> {
        self.characteristics
            .iter()
            .map(|entry| {
                let name = Characteristic::from_str(&entry.key)
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|_| entry.key.clone());
                format!("{} {:+}", name, entry.value)
            })
            .collect()
    }
}

// ===========================================================================
// Resource
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGrantConfig {
    pub resources: Vec<ResourceGrantEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGrantEntry {
    /// Resource type: wounds, fate, corruption, or insanity
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Quantity formula: flat, dice/characteristic, or roll-lookup table
    pub formula: String,
    #[serde(default)]
    pub optional: bool,
}

impl ResourceGrantConfig {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.resources.is_empty() {
            errors.push("Resource grant has no entries".to_string());
        }
        for entry in &self.resources {
            if let Err(e) = ResourceType::from_str(&entry.resource_type) {
                errors.push(e.to_string());
            }
            if let Err(e) = ResourceFormula::parse(&entry.formula) {
                errors.push(format!("Formula '{}': {}", entry.formula, e));
            }
        }
        errors
    }

    fn details(&self) -> Vec<String> {
        self.resources
            .iter()
            .map(|entry| {
                let name = ResourceType::from_str(&entry.resource_type)
                    .map(|r| r.display_name().to_string())
                    .unwrap_or_else(|_| entry.resource_type.clone());
                format!("{} +{}", name, entry.formula)
            })
            .collect()
    }
}

// ===========================================================================
// Choice
// ===========================================================================

/// A forced selection among option bundles.
///
/// Options are identified by their free-text label: renaming an option in
/// configuration desynchronizes previously stored applied state. This is a
/// known fragility of the persisted format, kept deliberately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceGrantConfig {
    /// How many selections the player must make
    pub count: u32,
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub allow_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Full nested grant configurations, dispatched through the factory
    pub grants: Vec<GrantConfig>,
}

impl ChoiceGrantConfig {
    pub fn option(&self, label: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.label == label)
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.count == 0 {
            errors.push("Choice grant requires a selection count of at least 1".to_string());
        }
        if self.options.is_empty() {
            errors.push("Choice grant has no options".to_string());
        }
        if !self.allow_duplicates && self.count as usize > self.options.len() {
            errors.push(format!(
                "Choice grant asks for {} selections but offers only {} options",
                self.count,
                self.options.len()
            ));
        }
        for option in &self.options {
            if option.label.trim().is_empty() {
                errors.push("Choice option has an empty label".to_string());
            }
            for nested in &option.grants {
                for error in nested.validate() {
                    errors.push(format!("Option '{}': {}", option.label, error));
                }
            }
        }
        errors
    }

    fn details(&self) -> Vec<String> {
        let mut details = vec![format!("Choose {}", self.count)];
        details.extend(self.options.iter().map(|o| o.label.clone()));
        details
    }
}
