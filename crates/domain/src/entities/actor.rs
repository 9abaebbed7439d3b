//! Actor entity - the character-sheet slice the grant engine reads and
//! mutates.
//!
//! This is an in-memory snapshot; persistence happens through the engine's
//! document-store port using path-keyed patches. The path helpers here are
//! the single source of truth for those patch keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{EntityKind, OwnedEntity};
use crate::ids::{ActorId, EntityId};
use crate::value_objects::{
    Characteristic, CharacteristicState, ResourcePool, ResourceType, SkillKey, SkillState,
    SpecializationEntry, TrainingLevel,
};

/// The character-sheet state touched by grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub characteristics: BTreeMap<Characteristic, CharacteristicState>,
    pub skills: BTreeMap<SkillKey, SkillState>,
    pub resources: BTreeMap<ResourceType, ResourcePool>,
    pub entities: Vec<OwnedEntity>,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        let mut characteristics = BTreeMap::new();
        for characteristic in Characteristic::all() {
            characteristics.insert(characteristic, CharacteristicState::default());
        }
        let mut resources = BTreeMap::new();
        for resource in ResourceType::all() {
            resources.insert(resource, ResourcePool::default());
        }
        Self {
            id: ActorId::new(),
            name: name.into(),
            characteristics,
            skills: BTreeMap::new(),
            resources,
            entities: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Characteristics
    // -------------------------------------------------------------------

    pub fn characteristic(&self, key: Characteristic) -> CharacteristicState {
        self.characteristics.get(&key).copied().unwrap_or_default()
    }

    pub fn characteristic_bonus(&self, key: Characteristic) -> i32 {
        self.characteristic(key).bonus()
    }

    pub fn set_characteristic_advance(&mut self, key: Characteristic, advance: i32) {
        self.characteristics.entry(key).or_default().advance = advance;
    }

    /// Patch path for a characteristic's advance counter.
    pub fn characteristic_advance_path(key: Characteristic) -> String {
        format!("system.characteristics.{}.advance", key)
    }

    // -------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------

    pub fn resource(&self, key: ResourceType) -> ResourcePool {
        self.resources.get(&key).copied().unwrap_or_default()
    }

    pub fn set_resource(&mut self, key: ResourceType, pool: ResourcePool) {
        self.resources.insert(key, pool);
    }

    /// Patch path for a whole resource pool.
    pub fn resource_path(key: ResourceType) -> String {
        format!("system.resources.{}", key)
    }

    // -------------------------------------------------------------------
    // Skills
    // -------------------------------------------------------------------

    pub fn skill(&self, key: SkillKey) -> Option<&SkillState> {
        self.skills.get(&key)
    }

    /// Current training level of a skill (or named specialization).
    /// Untracked skills are `Known`.
    pub fn skill_level(&self, key: SkillKey, specialization: Option<&str>) -> TrainingLevel {
        self.skills
            .get(&key)
            .and_then(|s| s.level(specialization))
            .unwrap_or_default()
    }

    pub fn set_skill(&mut self, key: SkillKey, state: SkillState) {
        self.skills.insert(key, state);
    }

    /// Sets a simple skill to a level, creating the entry when absent.
    pub fn set_simple_skill(&mut self, key: SkillKey, level: TrainingLevel) {
        self.skills.insert(key, SkillState::Simple(level.flags()));
    }

    /// Sets or creates a named specialization entry at `level`, returning the
    /// entry index and whether it was created.
    pub fn upsert_specialization(
        &mut self,
        key: SkillKey,
        name: &str,
        level: TrainingLevel,
    ) -> (usize, bool) {
        let state = self
            .skills
            .entry(key)
            .or_insert_with(|| SkillState::Specialist(Vec::new()));
        // A simple entry under a specialist key is malformed sheet data;
        // replace it with a fresh specialization list.
        if matches!(state, SkillState::Simple(_)) {
            *state = SkillState::Specialist(Vec::new());
        }
        let SkillState::Specialist(entries) = state else {
            unreachable!("specialist state ensured above");
        };
        if let Some(index) = entries.iter().position(|e| e.matches(name)) {
            entries[index].flags = level.flags();
            (index, false)
        } else {
            entries.push(SpecializationEntry::new(name, level));
            (entries.len() - 1, true)
        }
    }

    /// Removes a specialization entry by name, if present.
    pub fn remove_specialization(&mut self, key: SkillKey, name: &str) -> bool {
        if let Some(SkillState::Specialist(entries)) = self.skills.get_mut(&key) {
            if let Some(index) = entries.iter().position(|e| e.matches(name)) {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    /// Patch path for a whole skill entry.
    pub fn skill_path(key: SkillKey) -> String {
        format!("system.skills.{}", key)
    }

    // -------------------------------------------------------------------
    // Owned entities
    // -------------------------------------------------------------------

    pub fn entity(&self, id: EntityId) -> Option<&OwnedEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Finds an existing entity that duplicates the candidate
    /// (kind + name, plus specialization for talents).
    pub fn find_duplicate(&self, candidate: &OwnedEntity) -> Option<&OwnedEntity> {
        self.entities.iter().find(|e| e.duplicates(candidate))
    }

    pub fn add_entities(&mut self, entities: Vec<OwnedEntity>) {
        self.entities.extend(entities);
    }

    pub fn remove_entities(&mut self, ids: &[EntityId]) {
        self.entities.retain(|e| !ids.contains(&e.id));
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &OwnedEntity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }
}
