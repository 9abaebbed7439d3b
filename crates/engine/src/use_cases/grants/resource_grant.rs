//! Resource grant - adds a formula-driven quantity to a pool resource.
//!
//! Wounds and fate raise the pool's maximum by the same amount; corruption
//! and insanity only raise the current value.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{
    Actor, AppliedState, GrantConfig, GrantKind, LookupRow, ResourceApplied, ResourceFormula,
    ResourceGrantEntry, ResourceRestore, ResourceType, RestoreData,
};

use super::behavior::GrantBehavior;
use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

pub struct ResourceGrant {
    config: GrantConfig,
}

impl ResourceGrant {
    pub fn new(config: GrantConfig) -> Self {
        Self { config }
    }

    fn entries(&self) -> &[ResourceGrantEntry] {
        match &self.config.kind {
            GrantKind::Resource(config) => &config.resources,
            _ => &[],
        }
    }

    /// Evaluate a parsed formula against the actor through the external
    /// random source.
    async fn evaluate(
        ctx: &GrantContext,
        actor: &Actor,
        raw: &str,
        formula: &ResourceFormula,
    ) -> Result<i32, String> {
        match formula {
            ResourceFormula::Flat(value) => Ok(*value),
            ResourceFormula::Lookup(rows) => {
                let roll = ctx
                    .dice
                    .roll_d10()
                    .await
                    .map_err(|e| format!("Formula '{raw}': {e}"))?;
                match LookupRow::match_roll(rows, roll) {
                    Some(value) => Ok(value),
                    None => {
                        // Defined degenerate case: fall back to the first row.
                        let first = rows
                            .first()
                            .ok_or_else(|| format!("Formula '{raw}' has no lookup rows"))?;
                        tracing::warn!(
                            formula = raw,
                            roll,
                            fallback = first.value,
                            "No lookup range matched the roll, using first entry"
                        );
                        Ok(first.value)
                    }
                }
            }
            ResourceFormula::Dice(_) => {
                let expression = formula
                    .substitute(&|c| actor.characteristic_bonus(c))
                    .map_err(|e| format!("Formula '{raw}': {e}"))?;
                if expression.has_dice() {
                    ctx.dice
                        .roll(&expression)
                        .await
                        .map_err(|e| format!("Formula '{raw}': {e}"))
                } else {
                    Ok(expression.constant_value().unwrap_or_else(|| {
                        // Dice-free expressions always have a constant value.
                        expression.min_roll()
                    }))
                }
            }
        }
    }

    fn push_patch(
        actor: &mut Actor,
        patch: &mut HashMap<String, Value>,
        key: ResourceType,
        pool: grimward_domain::ResourcePool,
        errors: &mut Vec<String>,
    ) {
        actor.set_resource(key, pool);
        match serde_json::to_value(pool) {
            Ok(value) => {
                patch.insert(Actor::resource_path(key), value);
            }
            Err(e) => errors.push(format!("Could not serialize resource '{}': {}", key, e)),
        }
    }

    /// Add `amount` to the pool, raising the maximum for resources that
    /// track one.
    fn add(
        actor: &mut Actor,
        patch: &mut HashMap<String, Value>,
        key: ResourceType,
        amount: i32,
        errors: &mut Vec<String>,
    ) -> i32 {
        let mut pool = actor.resource(key);
        let previous = pool.value;
        pool.value += amount;
        if key.affects_maximum() {
            pool.maximum += amount;
        }
        Self::push_patch(actor, patch, key, pool, errors);
        previous
    }
}

#[async_trait]
impl GrantBehavior for ResourceGrant {
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
        let mut applied = BTreeMap::new();
        let mut patch = HashMap::new();

        for entry in self.entries() {
            let key = match ResourceType::from_str(&entry.resource_type) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            if !data.is_selected(&entry.resource_type) {
                if !entry.optional {
                    outcome.errors.push(format!(
                        "Required resource '{}' was not selected",
                        entry.resource_type
                    ));
                }
                continue;
            }
            // Reapplying the same formula recorded by a prior run is a no-op.
            if let Some(AppliedState::Resource(prior)) = &data.prior {
                if prior.get(key.as_str()).map(|p| p.formula.as_str())
                    == Some(entry.formula.as_str())
                {
                    let message =
                        format!("{} already granted, skipping", key.display_name());
                    ctx.notify(&message);
                    outcome.notifications.push(message);
                    continue;
                }
            }

            let formula = match ResourceFormula::parse(&entry.formula) {
                Ok(formula) => formula,
                Err(e) => {
                    outcome
                        .errors
                        .push(format!("Formula '{}': {}", entry.formula, e));
                    continue;
                }
            };
            // A pre-rolled value supplied out-of-band wins over evaluation,
            // so callers can show the roll before committing it.
            let rolled_value = match data.rolled_values.get(&key) {
                Some(value) => *value,
                None => match Self::evaluate(ctx, actor, &entry.formula, &formula).await {
                    Ok(value) => value,
                    Err(e) => {
                        outcome.errors.push(e);
                        continue;
                    }
                },
            };

            let previous_value =
                Self::add(actor, &mut patch, key, rolled_value, &mut outcome.errors);
            applied.insert(
                key.as_str().to_string(),
                ResourceApplied {
                    formula: entry.formula.clone(),
                    rolled_value,
                    previous_value,
                },
            );
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Resource(applied));
        }
        outcome
    }

    async fn reverse(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        applied: &AppliedState,
        options: ApplyOptions,
    ) -> ReverseOutcome {
        let AppliedState::Resource(records) = applied else {
            return ReverseOutcome::failed("Mismatched applied state for resource grant");
        };
        let mut outcome = ReverseOutcome::default();
        let mut restore = BTreeMap::new();
        let mut patch = HashMap::new();

        for (key_str, record) in records {
            let key = match ResourceType::from_str(key_str) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            Self::add(
                actor,
                &mut patch,
                key,
                -record.rolled_value,
                &mut outcome.errors,
            );
            restore.insert(
                key_str.clone(),
                ResourceRestore {
                    formula: record.formula.clone(),
                    rolled_value: record.rolled_value,
                },
            );
        }

        if !restore.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.restore = Some(RestoreData::Resource(restore));
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
        let RestoreData::Resource(records) = restore else {
            return GrantOutcome::failed("Mismatched restore data for resource grant");
        };
        let mut outcome = GrantOutcome::default();
        let mut applied = BTreeMap::new();
        let mut patch = HashMap::new();

        for (key_str, record) in records {
            let key = match ResourceType::from_str(key_str) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            // The recorded roll is re-added verbatim; no re-evaluation.
            let previous_value = Self::add(
                actor,
                &mut patch,
                key,
                record.rolled_value,
                &mut outcome.errors,
            );
            applied.insert(
                key_str.clone(),
                ResourceApplied {
                    formula: record.formula.clone(),
                    rolled_value: record.rolled_value,
                    previous_value,
                },
            );
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Resource(applied));
        }
        outcome
    }

    /// Only flat, fully-required entries can be applied unattended. Any
    /// randomness or characteristic lookup forces interactive confirmation.
    fn automatic_value(&self) -> Option<GrantData> {
        if self.config.optional || self.entries().iter().any(|e| e.optional) {
            return None;
        }
        for entry in self.entries() {
            let formula = ResourceFormula::parse(&entry.formula).ok()?;
            formula.flat_value()?;
        }
        Some(GrantData::with_selected(
            self.entries().iter().map(|e| e.resource_type.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimward_domain::ResourceGrantConfig;

    use crate::infrastructure::ports::{MockActorStore, MockDiceRoller, MockReferenceResolver};
    use crate::use_cases::grants::testing::{context, permissive_context};

    fn grant(resource_type: &str, formula: &str) -> ResourceGrant {
        ResourceGrant::new(GrantConfig::new(GrantKind::Resource(ResourceGrantConfig {
            resources: vec![ResourceGrantEntry {
                resource_type: resource_type.to_string(),
                formula: formula.to_string(),
                optional: false,
            }],
        })))
    }

    fn rolling_context(d10: Option<i32>, dice_total: Option<i32>) -> GrantContext {
        let mut store = MockActorStore::new();
        store.expect_update().returning(|_, _| Ok(()));
        let mut dice = MockDiceRoller::new();
        if let Some(roll) = d10 {
            dice.expect_roll_d10().returning(move || Ok(roll));
        }
        if let Some(total) = dice_total {
            dice.expect_roll().returning(move |_| Ok(total));
        }
        context(store, MockReferenceResolver::new(), dice)
    }

    #[tokio::test]
    async fn test_lookup_table_uses_matching_range() {
        let ctx = rolling_context(Some(6), None);
        let mut actor = Actor::new("Acolyte");
        let grant = grant("wounds", "(1-4|=2),(5-7|=3),(8-10|=4)");

        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        let Some(AppliedState::Resource(applied)) = outcome.applied else {
            panic!("expected resource applied state");
        };
        assert_eq!(applied["wounds"].rolled_value, 3);
        assert_eq!(actor.resource(ResourceType::Wounds).value, 3);
        assert_eq!(actor.resource(ResourceType::Wounds).maximum, 3);
    }

    #[tokio::test]
    async fn test_wounds_raise_maximum_corruption_does_not() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");

        let outcome = grant("wounds", "5")
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(actor.resource(ResourceType::Wounds).maximum, 5);

        let outcome = grant("corruption", "5")
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(actor.resource(ResourceType::Corruption).value, 5);
        assert_eq!(actor.resource(ResourceType::Corruption).maximum, 0);
    }

    #[tokio::test]
    async fn test_characteristic_token_formula_without_dice_needs_no_roll() {
        // "2tb" with toughness bonus 4 evaluates to 8 with no roller call.
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        if let Some(state) = actor
            .characteristics
            .get_mut(&grimward_domain::Characteristic::Toughness)
        {
            state.base = 40;
        }

        let outcome = grant("wounds", "2tb")
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(actor.resource(ResourceType::Wounds).value, 8);
    }

    #[tokio::test]
    async fn test_pre_rolled_value_wins_over_evaluation() {
        // No dice expectations: the supplied value must be used verbatim.
        let ctx = rolling_context(None, None);
        let mut actor = Actor::new("Acolyte");
        let grant = grant("fate", "1d5+2");

        let mut data = GrantData::default();
        data.rolled_values.insert(ResourceType::Fate, 4);
        let outcome = grant
            .apply(&ctx, &mut actor, &data, ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(actor.resource(ResourceType::Fate).value, 4);
    }

    #[tokio::test]
    async fn test_reverse_round_trips_value_and_maximum() {
        let ctx = rolling_context(None, Some(5));
        let mut actor = Actor::new("Acolyte");
        let grant = grant("wounds", "1d5+2");

        let applied = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await
            .applied
            .expect("applied");
        assert_eq!(actor.resource(ResourceType::Wounds).value, 5);

        let reversed = grant
            .reverse(&ctx, &mut actor, &applied, ApplyOptions::default())
            .await;
        assert!(reversed.success());
        assert_eq!(actor.resource(ResourceType::Wounds).value, 0);
        assert_eq!(actor.resource(ResourceType::Wounds).maximum, 0);

        // Restore replays the recorded roll without touching the roller.
        let restored = grant
            .restore(
                &ctx,
                &mut actor,
                &reversed.restore.expect("restore"),
                ApplyOptions::restoring(),
            )
            .await;
        assert!(restored.success());
        assert_eq!(actor.resource(ResourceType::Wounds).value, 5);
    }

    #[test]
    fn test_automatic_value_only_for_flat_required_entries() {
        assert!(grant("wounds", "5").automatic_value().is_some());
        assert!(grant("wounds", "1d5").automatic_value().is_none());
        assert!(grant("wounds", "tb").automatic_value().is_none());
        assert!(grant("wounds", "(1-5|=1),(6-10|=2)")
            .automatic_value()
            .is_none());
    }
}
