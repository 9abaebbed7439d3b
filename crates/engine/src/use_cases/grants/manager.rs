//! The grants manager - orchestrates apply/reverse/restore across a source
//! item's grant list, recursing into grants carried by created items.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use grimward_domain::{
    Actor, AppliedState, EntityId, GrantConfig, GrantSummary, OwnedEntity, RestoreData,
    SourceItem,
};

use crate::infrastructure::ports::{ActorStore, DiceRoller, NotificationSink, ReferenceResolver};

use super::behavior::GrantBehavior;
use super::factory::create_grant;
use super::types::{
    AppliedMap, ApplyOptions, BatchRunResult, GrantContext, GrantData, GrantDataMap,
    GrantRunResult, NestedAppliedMap, NestedRestoreMap, RestoreMap, ReverseRunResult,
};

/// Cap on cascading grants triggered by items that themselves carry grants.
/// Exceeding it stops recursion silently (logged, never an error) so cyclic
/// or runaway grant chains always terminate.
pub const MAX_DEPTH: u32 = 3;

pub struct GrantsManager {
    store: Arc<dyn ActorStore>,
    resolver: Arc<dyn ReferenceResolver>,
    dice: Arc<dyn DiceRoller>,
    notifier: Arc<dyn NotificationSink>,
}

impl GrantsManager {
    pub fn new(
        store: Arc<dyn ActorStore>,
        resolver: Arc<dyn ReferenceResolver>,
        dice: Arc<dyn DiceRoller>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            dice,
            notifier,
        }
    }

    fn context(&self, source_item: EntityId) -> GrantContext {
        GrantContext {
            store: Arc::clone(&self.store),
            resolver: Arc::clone(&self.resolver),
            dice: Arc::clone(&self.dice),
            notifier: Arc::clone(&self.notifier),
            source_item,
        }
    }

    /// Apply a source item's grants to the actor. Interactive data is keyed
    /// by grant id; grants without data fall back to their automatic value.
    /// Grants of items created along the way are processed recursively,
    /// depth-first, capped at [`MAX_DEPTH`].
    ///
    /// With `options.dry_run` the full result is computed against a scratch
    /// copy of the actor and nothing is persisted.
    pub async fn apply_item_grants(
        &self,
        item: &SourceItem,
        actor: &mut Actor,
        data: &GrantDataMap,
        options: ApplyOptions,
    ) -> GrantRunResult {
        let mut result = GrantRunResult::default();
        if options.dry_run {
            let mut scratch = actor.clone();
            self.apply_at_depth(
                item.id,
                &item.grants,
                &mut scratch,
                data,
                options,
                0,
                None,
                &mut result,
            )
            .await;
        } else {
            self.apply_at_depth(item.id, &item.grants, actor, data, options, 0, None, &mut result)
                .await;
        }
        tracing::info!(
            item = %item.name,
            grants = item.grants.len(),
            applied = result.applied.len(),
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "Item grants applied"
        );
        result
    }

    /// Undo a prior application, walking the grant list in reverse order.
    /// Grants carried by entities about to be deleted are unwound first
    /// (looked up in `nested` under the carrying entity's id), so undo
    /// mirrors the recursive apply.
    pub async fn reverse_item_grants(
        &self,
        item: &SourceItem,
        actor: &mut Actor,
        applied: &AppliedMap,
        nested: &NestedAppliedMap,
        options: ApplyOptions,
    ) -> ReverseRunResult {
        let mut result = ReverseRunResult::default();
        if options.dry_run {
            let mut scratch = actor.clone();
            self.reverse_at_depth(
                item.id,
                &item.grants,
                &mut scratch,
                applied,
                nested,
                options,
                0,
                None,
                &mut result,
            )
            .await;
        } else {
            self.reverse_at_depth(
                item.id,
                &item.grants,
                actor,
                applied,
                nested,
                options,
                0,
                None,
                &mut result,
            )
            .await;
        }
        tracing::info!(
            item = %item.name,
            reversed = result.restore.len(),
            errors = result.errors.len(),
            "Item grants reversed"
        );
        result
    }

    /// Re-grant from a reverse's restore package, in original order.
    /// Nested restore data is looked up under the id the carrying entity
    /// had when it was reversed; snapshots resurrect under that id and
    /// supply the grant lists to replay.
    pub async fn restore_item_grants(
        &self,
        item: &SourceItem,
        actor: &mut Actor,
        restore: &RestoreMap,
        nested: &NestedRestoreMap,
        options: ApplyOptions,
    ) -> GrantRunResult {
        let options = ApplyOptions {
            restore: true,
            ..options
        };
        let mut result = GrantRunResult::default();
        if options.dry_run {
            let mut scratch = actor.clone();
            self.restore_at_depth(
                item.id,
                &item.grants,
                &mut scratch,
                restore,
                nested,
                options,
                0,
                None,
                &mut result,
            )
            .await;
        } else {
            self.restore_at_depth(
                item.id,
                &item.grants,
                actor,
                restore,
                nested,
                options,
                0,
                None,
                &mut result,
            )
            .await;
        }
        result
    }

    /// Apply grants from an ordered list of source items sequentially, so
    /// later items observe earlier items' effects on the same actor.
    pub async fn apply_batch_grants(
        &self,
        items: &[SourceItem],
        actor: &mut Actor,
        data: &GrantDataMap,
        options: ApplyOptions,
    ) -> BatchRunResult {
        if options.dry_run {
            let mut scratch = actor.clone();
            return self.batch_inner(items, &mut scratch, data, options).await;
        }
        self.batch_inner(items, actor, data, options).await
    }

    async fn batch_inner(
        &self,
        items: &[SourceItem],
        actor: &mut Actor,
        data: &GrantDataMap,
        options: ApplyOptions,
    ) -> BatchRunResult {
        let mut batch = BatchRunResult::default();
        for item in items {
            let mut result = GrantRunResult::default();
            self.apply_at_depth(item.id, &item.grants, actor, data, options, 0, None, &mut result)
                .await;
            batch.items.push((item.id, result));
        }
        batch
    }

    /// Structural validation of every grant on the item.
    pub fn validate_item_grants(item: &SourceItem) -> Vec<String> {
        item.grants
            .iter()
            .flat_map(|config| config.validate())
            .collect()
    }

    /// Read-only summaries of every grant on the item.
    pub fn grants_summary(item: &SourceItem) -> Vec<GrantSummary> {
        item.grants.iter().map(GrantConfig::summary).collect()
    }

    /// Interactive data resolution: supplied slice, automatic value, an
    /// optional-skip, or an empty selection that surfaces required entries
    /// as errors.
    fn resolve_data(
        config: &GrantConfig,
        behavior: &dyn GrantBehavior,
        data: &GrantDataMap,
        result: &mut GrantRunResult,
    ) -> Option<GrantData> {
        if let Some(supplied) = data.get(&config.id) {
            return Some(supplied.clone());
        }
        if let Some(automatic) = behavior.automatic_value() {
            return Some(automatic);
        }
        if config.optional {
            result.notifications.push(format!(
                "Optional grant '{}' skipped (no selection supplied)",
                config.label.as_deref().unwrap_or(config.type_tag())
            ));
            return None;
        }
        Some(GrantData::with_selected(Vec::<String>::new()))
    }

    /// Entity ids created by an apply, including those buried in choice
    /// results, so recursion can follow grants the new entities carry.
    fn created_entities(state: &AppliedState) -> Vec<EntityId> {
        match state {
            AppliedState::Item(map) => map.values().copied().collect(),
            AppliedState::Choice(choice) => choice
                .grant_results
                .values()
                .flat_map(|results| results.values())
                .flat_map(Self::created_entities)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Entity snapshots held by a restore package, including those buried
    /// in choice restore data.
    fn restored_entities(data: &RestoreData) -> Vec<&OwnedEntity> {
        match data {
            RestoreData::Item(snapshots) => snapshots.iter().collect(),
            RestoreData::Choice(choice) => choice
                .grants
                .values()
                .flat_map(|stored| stored.values())
                .flat_map(Self::restored_entities)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Grants carried by a created entity, cloned out so the actor borrow
    /// can be released before recursing. `None` when the depth cap stops
    /// the recursion.
    fn nested_grants(
        actor: &Actor,
        entity_id: EntityId,
        depth: u32,
    ) -> Option<Vec<GrantConfig>> {
        let entity = actor.entity(entity_id)?;
        if entity.grants.is_empty() {
            return None;
        }
        if depth + 1 > MAX_DEPTH {
            tracing::warn!(
                entity = %entity.name,
                depth,
                max_depth = MAX_DEPTH,
                "Grant recursion depth cap reached, skipping nested grants"
            );
            return None;
        }
        Some(entity.grants.clone())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_at_depth<'a>(
        &'a self,
        source_item: EntityId,
        grants: &'a [GrantConfig],
        actor: &'a mut Actor,
        data: &'a GrantDataMap,
        options: ApplyOptions,
        depth: u32,
        scope: Option<EntityId>,
        result: &'a mut GrantRunResult,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let ctx = self.context(source_item);
            for config in grants {
                let behavior = create_grant(config.clone());
                let Some(grant_data) =
                    Self::resolve_data(config, behavior.as_ref(), data, result)
                else {
                    continue;
                };
                let outcome = behavior.apply(&ctx, actor, &grant_data, options).await;
                let created: Vec<EntityId> = outcome
                    .applied
                    .as_ref()
                    .map(Self::created_entities)
                    .unwrap_or_default();
                result.absorb(scope, config.id, outcome);

                for entity_id in created {
                    let Some(nested) = Self::nested_grants(actor, entity_id, depth) else {
                        continue;
                    };
                    self.apply_at_depth(
                        entity_id,
                        &nested,
                        actor,
                        data,
                        options,
                        depth + 1,
                        Some(entity_id),
                        result,
                    )
                    .await;
                }
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn reverse_at_depth<'a>(
        &'a self,
        source_item: EntityId,
        grants: &'a [GrantConfig],
        actor: &'a mut Actor,
        applied: &'a AppliedMap,
        nested: &'a NestedAppliedMap,
        options: ApplyOptions,
        depth: u32,
        scope: Option<EntityId>,
        result: &'a mut ReverseRunResult,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let ctx = self.context(source_item);
            for config in grants.iter().rev() {
                let Some(state) = applied.get(&config.id) else {
                    continue;
                };
                // Unwind grants carried by entities this reversal deletes.
                for entity_id in Self::created_entities(state) {
                    let Some(nested_grants) = Self::nested_grants(actor, entity_id, depth)
                    else {
                        continue;
                    };
                    let Some(entity_applied) = nested.get(&entity_id) else {
                        continue;
                    };
                    self.reverse_at_depth(
                        entity_id,
                        &nested_grants,
                        actor,
                        entity_applied,
                        nested,
                        options,
                        depth + 1,
                        Some(entity_id),
                        result,
                    )
                    .await;
                }
                let behavior = create_grant(config.clone());
                let outcome = behavior.reverse(&ctx, actor, state, options).await;
                result.absorb(scope, config.id, outcome);
            }
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn restore_at_depth<'a>(
        &'a self,
        source_item: EntityId,
        grants: &'a [GrantConfig],
        actor: &'a mut Actor,
        restore: &'a RestoreMap,
        nested: &'a NestedRestoreMap,
        options: ApplyOptions,
        depth: u32,
        scope: Option<EntityId>,
        result: &'a mut GrantRunResult,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let ctx = self.context(source_item);
            for config in grants {
                let Some(stored) = restore.get(&config.id) else {
                    continue;
                };
                let behavior = create_grant(config.clone());
                let outcome = behavior.restore(&ctx, actor, stored, options).await;
                result.absorb(scope, config.id, outcome);

                // The snapshots in the restore package carry the ids the
                // nested data is keyed by and the grant lists to replay.
                for snapshot in Self::restored_entities(stored) {
                    if snapshot.grants.is_empty() {
                        continue;
                    }
                    if depth + 1 > MAX_DEPTH {
                        tracing::warn!(
                            entity = %snapshot.name,
                            depth,
                            max_depth = MAX_DEPTH,
                            "Grant recursion depth cap reached, skipping nested restore"
                        );
                        continue;
                    }
                    let Some(entity_restore) = nested.get(&snapshot.id) else {
                        continue;
                    };
                    let nested_grants = snapshot.grants.clone();
                    self.restore_at_depth(
                        snapshot.id,
                        &nested_grants,
                        actor,
                        entity_restore,
                        nested,
                        options,
                        depth + 1,
                        Some(snapshot.id),
                        result,
                    )
                    .await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimward_domain::{
        Characteristic, CharacteristicGrantConfig, CharacteristicGrantEntry, GrantKind,
        ResourceGrantConfig, ResourceGrantEntry, ResourceType,
    };

    use crate::infrastructure::notify::CollectingNotifier;
    use crate::infrastructure::ports::{MockActorStore, MockDiceRoller, MockReferenceResolver};

    fn characteristic_grant(key: &str, value: i32) -> GrantConfig {
        GrantConfig::new(GrantKind::Characteristic(CharacteristicGrantConfig {
            characteristics: vec![CharacteristicGrantEntry {
                key: key.to_string(),
                value,
                optional: false,
            }],
        }))
    }

    fn manager_with(store: MockActorStore) -> GrantsManager {
        GrantsManager::new(
            Arc::new(store),
            Arc::new(MockReferenceResolver::new()),
            Arc::new(MockDiceRoller::new()),
            Arc::new(CollectingNotifier::new()),
        )
    }

    fn permissive_manager() -> GrantsManager {
        let mut store = MockActorStore::new();
        store.expect_update().returning(|_, _| Ok(()));
        store
            .expect_create_embedded()
            .returning(|_, entities| Ok(entities));
        store.expect_delete_embedded().returning(|_, _| Ok(()));
        manager_with(store)
    }

    #[tokio::test]
    async fn test_apply_aggregates_by_grant_id() {
        let manager = permissive_manager();
        let mut actor = Actor::new("Acolyte");
        let item = SourceItem::new(
            "Origin: Voidborn",
            vec![
                characteristic_grant("toughness", 2),
                characteristic_grant("willpower", 5),
            ],
        );

        let result = manager
            .apply_item_grants(&item, &mut actor, &GrantDataMap::new(), ApplyOptions::default())
            .await;
        assert!(result.success());
        assert_eq!(result.applied.len(), 2);
        assert!(result.applied.contains_key(&item.grants[0].id));
        assert!(result.applied.contains_key(&item.grants[1].id));
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
        assert_eq!(actor.characteristic(Characteristic::Willpower).advance, 5);
    }

    #[tokio::test]
    async fn test_malformed_grant_does_not_block_the_rest() {
        let manager = permissive_manager();
        let mut actor = Actor::new("Acolyte");
        let item = SourceItem::new(
            "Odd Reward",
            vec![
                characteristic_grant("luck", 2),
                characteristic_grant("toughness", 1),
            ],
        );

        let result = manager
            .apply_item_grants(&item, &mut actor, &GrantDataMap::new(), ApplyOptions::default())
            .await;
        assert!(!result.success());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.applied.len(), 1);
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 1);
    }

    #[tokio::test]
    async fn test_optional_grant_without_data_is_skipped_with_notification() {
        let manager = permissive_manager();
        let mut actor = Actor::new("Acolyte");
        let mut config = GrantConfig::new(GrantKind::Resource(ResourceGrantConfig {
            resources: vec![ResourceGrantEntry {
                resource_type: "fate".to_string(),
                formula: "1d5".to_string(),
                optional: false,
            }],
        }));
        config.optional = true;
        let item = SourceItem::new("Blessing", vec![config]);

        let result = manager
            .apply_item_grants(&item, &mut actor, &GrantDataMap::new(), ApplyOptions::default())
            .await;
        assert!(result.success());
        assert!(result.applied.is_empty());
        assert_eq!(result.notifications.len(), 1);
        assert_eq!(actor.resource(ResourceType::Fate).value, 0);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_caller_actor_untouched() {
        // No store expectations: a dry run must never reach the store.
        let manager = manager_with(MockActorStore::new());
        let mut actor = Actor::new("Acolyte");
        let item = SourceItem::new("Origin", vec![characteristic_grant("toughness", 2)]);

        let result = manager
            .apply_item_grants(&item, &mut actor, &GrantDataMap::new(), ApplyOptions::dry_run())
            .await;
        assert!(result.success());
        assert_eq!(result.applied.len(), 1);
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 0);
    }

    #[tokio::test]
    async fn test_reverse_then_restore_round_trip() {
        let manager = permissive_manager();
        let mut actor = Actor::new("Acolyte");
        let item = SourceItem::new("Origin", vec![characteristic_grant("toughness", 2)]);

        let run = manager
            .apply_item_grants(&item, &mut actor, &GrantDataMap::new(), ApplyOptions::default())
            .await;
        let reversed = manager
            .reverse_item_grants(&item, &mut actor, &run.applied, &run.nested, ApplyOptions::default())
            .await;
        assert!(reversed.success());
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 0);

        let restored = manager
            .restore_item_grants(
                &item,
                &mut actor,
                &reversed.restore,
                &reversed.nested,
                ApplyOptions::default(),
            )
            .await;
        assert!(restored.success());
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
    }

    #[tokio::test]
    async fn test_batch_is_sequential_and_cumulative() {
        let manager = permissive_manager();
        let mut actor = Actor::new("Acolyte");
        let items = vec![
            SourceItem::new("Origin", vec![characteristic_grant("toughness", 2)]),
            SourceItem::new("Background", vec![characteristic_grant("toughness", 3)]),
        ];

        let batch = manager
            .apply_batch_grants(&items, &mut actor, &GrantDataMap::new(), ApplyOptions::default())
            .await;
        assert!(batch.success());
        assert_eq!(batch.items.len(), 2);
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 5);
    }

    #[test]
    fn test_validation_and_summary_are_pure() {
        let item = SourceItem::new(
            "Origin",
            vec![
                characteristic_grant("toughness", 2),
                characteristic_grant("luck", 1),
            ],
        );
        assert_eq!(GrantsManager::validate_item_grants(&item).len(), 1);
        let summaries = GrantsManager::grants_summary(&item);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].type_tag, "characteristic");
    }
}
