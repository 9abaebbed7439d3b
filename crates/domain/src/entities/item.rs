//! Item-shaped entities: resolved templates, owned embedded entities, and
//! the source items that carry grant configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grants::GrantConfig;
use crate::ids::{EntityId, GrantId};

/// The kinds of embedded entity an item grant is allowed to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Talent,
    Trait,
    Weapon,
    Armour,
    Gear,
    Ammunition,
    Cybernetic,
    ForceField,
    SpecialAbility,
    /// Unknown kind for forward compatibility with host data
    #[serde(other)]
    Unknown,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Talent => "talent",
            Self::Trait => "trait",
            Self::Weapon => "weapon",
            Self::Armour => "armour",
            Self::Gear => "gear",
            Self::Ammunition => "ammunition",
            Self::Cybernetic => "cybernetic",
            Self::ForceField => "forceField",
            Self::SpecialAbility => "specialAbility",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this kind is in the item-grant allow-list.
    pub fn grantable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Parses a host kind string; anything outside the allow-list maps to
    /// `Unknown`.
    pub fn parse(s: &str) -> EntityKind {
        match s {
            "talent" => Self::Talent,
            "trait" => Self::Trait,
            "weapon" => Self::Weapon,
            "armour" | "armor" => Self::Armour,
            "gear" => Self::Gear,
            "ammunition" | "ammo" => Self::Ammunition,
            "cybernetic" => Self::Cybernetic,
            "forceField" => Self::ForceField,
            "specialAbility" => Self::SpecialAbility,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A compendium-resolved template backing an item grant entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    /// The stable reference id this template was resolved from
    pub reference: String,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    /// Raw host data, deep-merged with per-entry overrides at creation
    #[serde(default)]
    pub data: Value,
    /// Grant configurations the template itself carries
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

/// Provenance flags linking a created entity back to the grant that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantProvenance {
    pub source_item: EntityId,
    pub grant_id: GrantId,
}

/// An embedded entity owned by an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedEntity {
    pub id: EntityId,
    /// The compendium reference this entity was created from, if any
    #[serde(default)]
    pub reference: Option<String>,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Grant configurations carried over from the template
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
    #[serde(default)]
    pub provenance: Option<GrantProvenance>,
    pub created_at: DateTime<Utc>,
}

impl OwnedEntity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            reference: None,
            kind,
            name: name.into(),
            specialization: None,
            data: Value::Null,
            grants: Vec::new(),
            provenance: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Builds an embedded entity from a resolved template, stamping provenance.
    pub fn from_template(template: &ItemTemplate, provenance: GrantProvenance) -> Self {
        Self {
            id: EntityId::new(),
            reference: Some(template.reference.clone()),
            kind: template.kind,
            name: template.name.clone(),
            specialization: template.specialization.clone(),
            data: template.data.clone(),
            grants: template.grants.clone(),
            provenance: Some(provenance),
            created_at: Utc::now(),
        }
    }

    /// Duplicate equality: kind and name, plus specialization for talents.
    pub fn duplicates(&self, other: &OwnedEntity) -> bool {
        if self.kind != other.kind || !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }
        if self.kind == EntityKind::Talent {
            return match (&self.specialization, &other.specialization) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            };
        }
        true
    }
}

/// A source of grants: an origin step, talent, or reward applied to an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    pub id: EntityId,
    pub name: String,
    pub grants: Vec<GrantConfig>,
}

impl SourceItem {
    pub fn new(name: impl Into<String>, grants: Vec<GrantConfig>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            grants,
        }
    }
}
