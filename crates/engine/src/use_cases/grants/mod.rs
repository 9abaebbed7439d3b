//! The grant application engine.
//!
//! Five variant behaviors (item, skill, characteristic, resource, choice)
//! behind one contract, a factory dispatching on the configuration's type
//! tag, and a manager orchestrating apply/reverse/restore across a source
//! item's grant list with bounded recursion into granted items.

mod behavior;
mod characteristic_grant;
mod choice_grant;
mod factory;
mod item_grant;
mod manager;
mod migration;
mod resource_grant;
mod skill_grant;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;
mod types;

pub use behavior::GrantBehavior;
pub use characteristic_grant::CharacteristicGrant;
pub use choice_grant::ChoiceGrant;
pub use factory::create_grant;
pub use item_grant::ItemGrant;
pub use manager::{GrantsManager, MAX_DEPTH};
pub use migration::{extract_grants, migrate_legacy, source_item_from_document};
pub use resource_grant::ResourceGrant;
pub use skill_grant::SkillGrant;
pub use types::{
    AppliedMap, ApplyOptions, BatchRunResult, GrantContext, GrantData, GrantDataMap,
    GrantOutcome, GrantRunResult, NestedAppliedMap, NestedRestoreMap, RestoreMap,
    ReverseOutcome, ReverseRunResult,
};
