//! External capability port traits (document store, resolver, dice, notifications).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{Actor, ActorId, DiceExpression, EntityId, ItemTemplate, OwnedEntity};

use super::error::{DiceError, StoreError};

/// The host document store, reduced to what the grant engine needs.
///
/// `update` takes a path-keyed patch map (`"system.characteristics.toughness.advance"`
/// style); the store owns how those paths map onto its documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn fetch(&self, id: ActorId) -> Result<Actor, StoreError>;

    /// Apply a path-keyed patch to the actor document.
    async fn update(&self, id: ActorId, patch: HashMap<String, Value>) -> Result<(), StoreError>;

    /// Create embedded entities in one batch. The returned entities carry
    /// their store-assigned ids, in input order.
    async fn create_embedded(
        &self,
        id: ActorId,
        entities: Vec<OwnedEntity>,
    ) -> Result<Vec<OwnedEntity>, StoreError>;

    async fn delete_embedded(&self, id: ActorId, ids: &[EntityId]) -> Result<(), StoreError>;
}

/// Resolves a stable reference id to the item template behind it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Option<ItemTemplate>;
}

/// The external random source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiceRoller: Send + Sync {
    /// Roll a full dice expression and return its total.
    async fn roll(&self, expression: &DiceExpression) -> Result<i32, DiceError>;

    /// One ten-sided die, used by roll-lookup tables.
    async fn roll_d10(&self) -> Result<i32, DiceError>;
}

/// Fire-and-forget channel for human-readable messages. Not part of the
/// success/failure contract.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str);
}
