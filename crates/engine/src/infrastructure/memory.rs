//! In-memory adapters for the store and resolver ports.
//!
//! Used by integration tests and by callers running without a host. Actors
//! are kept as JSON documents so path-keyed patches apply the same way they
//! would against the host document store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{Actor, ActorId, EntityId, ItemTemplate, OwnedEntity};

use super::ports::{ActorStore, ReferenceResolver, StoreError};

/// Actor documents behind a mutex, patched in place.
#[derive(Default)]
pub struct InMemoryActorStore {
    actors: Mutex<HashMap<ActorId, Value>>,
}

impl InMemoryActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an actor snapshot.
    pub fn insert(&self, actor: &Actor) -> Result<(), StoreError> {
        let doc = serde_json::to_value(actor).map_err(StoreError::serialization)?;
        self.lock()?.insert(actor.id, doc);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ActorId, Value>>, StoreError> {
        self.actors
            .lock()
            .map_err(|_| StoreError::storage("lock", "actor store mutex poisoned"))
    }

    /// Sets `value` at a dot-separated `path` inside `doc`, creating
    /// intermediate objects. The host keeps sheet data under a `system`
    /// envelope; our snapshots are flat, so that prefix is stripped.
    fn apply_path(doc: &mut Value, path: &str, value: Value) {
        let path = path.strip_prefix("system.").unwrap_or(path);
        let mut cursor = doc;
        let mut remaining = path;
        loop {
            match remaining.split_once('.') {
                Some((head, tail)) => {
                    if !cursor.is_object() {
                        *cursor = Value::Object(serde_json::Map::new());
                    }
                    let Some(map) = cursor.as_object_mut() else {
                        return;
                    };
                    cursor = map
                        .entry(head.to_string())
                        .or_insert_with(|| Value::Object(serde_json::Map::new()));
                    remaining = tail;
                }
                None => {
                    if let Some(map) = cursor.as_object_mut() {
                        map.insert(remaining.to_string(), value);
                    }
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ActorStore for InMemoryActorStore {
    async fn fetch(&self, id: ActorId) -> Result<Actor, StoreError> {
        let doc = self
            .lock()?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Actor", id))?;
        serde_json::from_value(doc).map_err(StoreError::serialization)
    }

    async fn update(&self, id: ActorId, patch: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut actors = self.lock()?;
        let doc = actors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Actor", id))?;
        for (path, value) in patch {
            Self::apply_path(doc, &path, value);
        }
        Ok(())
    }

    async fn create_embedded(
        &self,
        id: ActorId,
        entities: Vec<OwnedEntity>,
    ) -> Result<Vec<OwnedEntity>, StoreError> {
        let mut actors = self.lock()?;
        let doc = actors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Actor", id))?;
        let serialized: Vec<Value> = entities
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .map_err(StoreError::serialization)?;
        match doc.get_mut("entities").and_then(Value::as_array_mut) {
            Some(array) => array.extend(serialized),
            None => Self::apply_path(doc, "entities", Value::Array(serialized)),
        }
        Ok(entities)
    }

    async fn delete_embedded(&self, id: ActorId, ids: &[EntityId]) -> Result<(), StoreError> {
        let mut actors = self.lock()?;
        let doc = actors
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Actor", id))?;
        if let Some(array) = doc.get_mut("entities").and_then(Value::as_array_mut) {
            let gone: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
            array.retain(|entity| {
                entity
                    .get("id")
                    .and_then(Value::as_str)
                    .map(|id| !gone.iter().any(|g| g == id))
                    .unwrap_or(true)
            });
        }
        Ok(())
    }
}

/// Template map for reference resolution.
#[derive(Default)]
pub struct StaticResolver {
    templates: HashMap<String, ItemTemplate>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: ItemTemplate) -> Self {
        self.templates.insert(template.reference.clone(), template);
        self
    }

    pub fn add(&mut self, template: ItemTemplate) {
        self.templates.insert(template.reference.clone(), template);
    }
}

#[async_trait]
impl ReferenceResolver for StaticResolver {
    async fn resolve(&self, reference: &str) -> Option<ItemTemplate> {
        self.templates.get(reference).cloned()
    }
}
