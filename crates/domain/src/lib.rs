extern crate self as grimward_domain;

pub mod entities;
pub mod error;
pub mod grants;
pub mod ids;
pub mod value_objects;

pub use entities::{Actor, EntityKind, GrantProvenance, ItemTemplate, OwnedEntity, SourceItem};

pub use error::DomainError;

pub use grants::{
    selection_key, AppliedState, CharacteristicApplied, CharacteristicGrantConfig,
    CharacteristicGrantEntry, ChoiceApplied, ChoiceGrantConfig, ChoiceOption, ChoiceRestore,
    GrantConfig, GrantKind, GrantSummary, ItemGrantConfig, ItemGrantEntry, ResourceApplied,
    ResourceGrantConfig, ResourceGrantEntry, ResourceRestore, RestoreData, SkillApplied,
    SkillChange, SkillGrantConfig, SkillGrantEntry,
};

pub use ids::{ActorId, EntityId, GrantId};

pub use value_objects::{
    Characteristic, CharacteristicState, DiceExpression, DiceParseError, DiceTerm, FormulaTerm,
    LookupRow, ResourceFormula, ResourcePool, ResourceType, RollBreakdown, SkillKey, SkillState,
    SpecializationEntry, TrainingFlags, TrainingLevel,
};
