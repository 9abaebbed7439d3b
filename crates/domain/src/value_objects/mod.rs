//! Value objects - Immutable objects defined by their attributes

mod characteristic;
mod dice;
mod formula;
mod resource;
mod skill;
mod training;

pub use characteristic::{Characteristic, CharacteristicState};
pub use dice::{DiceExpression, DiceParseError, DiceTerm, RollBreakdown};
pub use formula::{FormulaTerm, LookupRow, ResourceFormula};
pub use resource::{ResourcePool, ResourceType};
pub use skill::{SkillKey, SkillState, SpecializationEntry};
pub use training::{TrainingFlags, TrainingLevel};
