//! Grant data model: immutable configurations and serializable application
//! records.

mod applied;
mod config;

pub use applied::{
    selection_key, AppliedState, CharacteristicApplied, ChoiceApplied, ChoiceRestore,
    ResourceApplied, ResourceRestore, RestoreData, SkillApplied, SkillChange,
};
pub use config::{
    CharacteristicGrantConfig, CharacteristicGrantEntry, ChoiceGrantConfig, ChoiceOption,
    GrantConfig, GrantKind, GrantSummary, ItemGrantConfig, ItemGrantEntry, ResourceGrantConfig,
    ResourceGrantEntry, SkillGrantConfig, SkillGrantEntry,
};
