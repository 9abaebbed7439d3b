//! Domain entities - Core business objects with identity

mod actor;
mod item;

pub use actor::Actor;
pub use item::{EntityKind, GrantProvenance, ItemTemplate, OwnedEntity, SourceItem};
