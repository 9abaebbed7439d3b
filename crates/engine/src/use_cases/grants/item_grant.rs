//! Item grant - snapshots referenced templates as new owned entities.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{
    Actor, AppliedState, EntityId, GrantConfig, GrantKind, GrantProvenance, ItemGrantEntry,
    OwnedEntity, RestoreData,
};

use super::behavior::GrantBehavior;
use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

pub struct ItemGrant {
    config: GrantConfig,
}

impl ItemGrant {
    pub fn new(config: GrantConfig) -> Self {
        Self { config }
    }

    fn entries(&self) -> &[ItemGrantEntry] {
        match &self.config.kind {
            GrantKind::Item(config) => &config.items,
            _ => &[],
        }
    }

    /// Recursive merge of `overlay` into `target`; objects merge key-wise,
    /// everything else is replaced.
    fn deep_merge(target: &mut Value, overlay: &Value) {
        match (target, overlay) {
            (Value::Object(target), Value::Object(overlay)) => {
                for (key, value) in overlay {
                    Self::deep_merge(
                        target.entry(key.clone()).or_insert(Value::Null),
                        value,
                    );
                }
            }
            (target, overlay) => *target = overlay.clone(),
        }
    }

    /// Apply per-entry overrides to a freshly built entity. A `name`
    /// override renames the entity itself; the rest merges into its data.
    fn apply_overrides(entity: &mut OwnedEntity, overrides: &Value) {
        if let Some(name) = overrides.get("name").and_then(Value::as_str) {
            entity.name = name.to_string();
        }
        let mut rest = overrides.clone();
        if let Some(map) = rest.as_object_mut() {
            map.remove("name");
        }
        if !rest.is_null() && rest.as_object().map(|m| !m.is_empty()).unwrap_or(true) {
            if entity.data.is_null() {
                entity.data = Value::Object(serde_json::Map::new());
            }
            Self::deep_merge(&mut entity.data, &rest);
        }
    }

    /// Batch-create pending entities and key the applied map by the
    /// original reference id.
    async fn create_batch(
        ctx: &GrantContext,
        actor: &mut Actor,
        pending: Vec<OwnedEntity>,
        options: ApplyOptions,
        outcome: &mut GrantOutcome,
    ) {
        if pending.is_empty() {
            return;
        }
        let created = if options.dry_run {
            // Local ids stand in for store-assigned ones.
            pending
        } else {
            match ctx.store.create_embedded(actor.id, pending).await {
                Ok(created) => created,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    return;
                }
            }
        };
        let mut applied = BTreeMap::new();
        for entity in &created {
            let key = entity
                .reference
                .clone()
                .unwrap_or_else(|| entity.name.clone());
            applied.insert(key, entity.id);
        }
        actor.add_entities(created);
        outcome.applied = Some(AppliedState::Item(applied));
    }
}

#[async_trait]
impl GrantBehavior for ItemGrant {
    fn config(&self) -> &GrantConfig {
        &self.config
    }

    async fn apply(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        data: &GrantData,
        options: ApplyOptions,
    ) -> GrantOutcome {
        let mut outcome = GrantOutcome::default();
        let mut pending: Vec<OwnedEntity> = Vec::new();

        for entry in self.entries() {
            if !data.is_selected(&entry.uuid) {
                if !entry.optional {
                    outcome
                        .errors
                        .push(format!("Required item '{}' was not selected", entry.uuid));
                }
                continue;
            }
            if entry.uuid.is_empty() {
                // Legacy-migration placeholder without a stable reference.
                let name = entry
                    .overrides
                    .as_ref()
                    .and_then(|o| o.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown item");
                let message = format!("Skipping unresolved legacy item entry '{}'", name);
                ctx.notify(&message);
                outcome.notifications.push(message);
                continue;
            }

            let Some(template) = ctx.resolver.resolve(&entry.uuid).await else {
                outcome
                    .errors
                    .push(format!("Could not resolve item reference '{}'", entry.uuid));
                continue;
            };
            if !template.kind.grantable() {
                outcome.errors.push(format!(
                    "Item '{}' has kind '{}', which cannot be granted",
                    template.name, template.kind
                ));
                continue;
            }

            let mut entity = OwnedEntity::from_template(
                &template,
                GrantProvenance {
                    source_item: ctx.source_item,
                    grant_id: self.config.id,
                },
            );
            if let Some(overrides) = &entry.overrides {
                Self::apply_overrides(&mut entity, overrides);
            }

            // Duplicates on the actor or within this batch are skipped.
            let duplicate = actor.find_duplicate(&entity).is_some()
                || pending.iter().any(|p| p.duplicates(&entity));
            if duplicate {
                let message = format!("'{}' already exists, skipping", entity.name);
                ctx.notify(&message);
                outcome.notifications.push(message);
                continue;
            }
            pending.push(entity);
        }

        Self::create_batch(ctx, actor, pending, options, &mut outcome).await;
        outcome
    }

    async fn reverse(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        applied: &AppliedState,
        options: ApplyOptions,
    ) -> ReverseOutcome {
        let AppliedState::Item(records) = applied else {
            return ReverseOutcome::failed("Mismatched applied state for item grant");
        };
        let mut outcome = ReverseOutcome::default();
        let mut snapshots = Vec::new();
        let mut ids: Vec<EntityId> = Vec::new();

        // Delete exactly the recorded ids, nothing else; the snapshots make
        // the deletion restorable even if other fields were edited since.
        for (reference, entity_id) in records {
            match actor.entity(*entity_id) {
                Some(entity) => {
                    snapshots.push(entity.clone());
                    ids.push(*entity_id);
                }
                None => {
                    let message =
                        format!("Granted item from '{}' was already removed", reference);
                    ctx.notify(&message);
                    outcome.notifications.push(message);
                }
            }
        }

        if !ids.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.delete_embedded(actor.id, &ids).await {
                    outcome.errors.push(e.to_string());
                    return outcome;
                }
            }
            actor.remove_entities(&ids);
            outcome.restore = Some(RestoreData::Item(snapshots));
        }
        outcome
    }

    async fn restore(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        restore: &RestoreData,
        options: ApplyOptions,
    ) -> GrantOutcome {
        let RestoreData::Item(snapshots) = restore else {
            return GrantOutcome::failed("Mismatched restore data for item grant");
        };
        let mut outcome = GrantOutcome::default();
        let mut pending: Vec<OwnedEntity> = Vec::new();

        for snapshot in snapshots {
            if actor.find_duplicate(snapshot).is_some() {
                let message = format!("'{}' already exists, skipping", snapshot.name);
                ctx.notify(&message);
                outcome.notifications.push(message);
                continue;
            }
            // Resurrected under the recorded id so state keyed by it still
            // matches; the store may assign a fresh one on creation.
            pending.push(snapshot.clone());
        }

        Self::create_batch(ctx, actor, pending, options, &mut outcome).await;
        outcome
    }

    fn automatic_value(&self) -> Option<GrantData> {
        if self.config.optional || self.entries().iter().any(|e| e.optional) {
            return None;
        }
        Some(GrantData::with_selected(
            self.entries().iter().map(|e| e.uuid.clone()),
        ))
    }
}
