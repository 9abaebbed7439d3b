//! Port traits for the host boundary.
//!
//! These are the ONLY abstractions in the engine. Ports exist for:
//! - Actor persistence (host document store)
//! - Reference resolution (host compendium)
//! - Randomness (host dice roller, seedable in tests)
//! - Notifications (fire-and-forget user messages)

mod error;
mod external;

pub use error::{DiceError, StoreError};
pub use external::{ActorStore, DiceRoller, NotificationSink, ReferenceResolver};

#[cfg(test)]
pub use external::{MockActorStore, MockDiceRoller, MockReferenceResolver};
