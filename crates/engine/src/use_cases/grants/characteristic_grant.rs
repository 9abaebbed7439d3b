//! Characteristic grant - adds a signed delta to a characteristic's
//! advance counter.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{
    Actor, AppliedState, Characteristic, CharacteristicApplied, GrantConfig, GrantKind,
    RestoreData,
};

use super::behavior::GrantBehavior;
use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

pub struct CharacteristicGrant {
    config: GrantConfig,
}

impl CharacteristicGrant {
    pub fn new(config: GrantConfig) -> Self {
        Self { config }
    }

    fn entries(&self) -> &[grimward_domain::CharacteristicGrantEntry] {
        match &self.config.kind {
            GrantKind::Characteristic(config) => &config.characteristics,
            _ => &[],
        }
    }

    fn push_patch(
        actor: &mut Actor,
        patch: &mut HashMap<String, Value>,
        key: Characteristic,
        new_value: i32,
    ) {
        actor.set_characteristic_advance(key, new_value);
        patch.insert(
            Actor::characteristic_advance_path(key),
            Value::from(new_value),
        );
    }
}

#[async_trait]
impl GrantBehavior for CharacteristicGrant {
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
            let key = match Characteristic::from_str(&entry.key) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            if !data.is_selected(&entry.key) {
                if !entry.optional {
                    outcome.errors.push(format!(
                        "Required characteristic '{}' was not selected",
                        entry.key
                    ));
                }
                continue;
            }
            if entry.value == 0 {
                continue;
            }
            // Reapplying an identical prior grant is a no-op, not an error.
            if let Some(AppliedState::Characteristic(prior)) = &data.prior {
                if prior.get(key.as_str()).map(|p| p.applied_value) == Some(entry.value) {
                    let message = format!(
                        "{} advance already granted, skipping",
                        key.display_name()
                    );
                    ctx.notify(&message);
                    outcome.notifications.push(message);
                    continue;
                }
            }

            let previous_value = actor.characteristic(key).advance;
            let new_value = previous_value + entry.value;
            Self::push_patch(actor, &mut patch, key, new_value);
            applied.insert(
                key.as_str().to_string(),
                CharacteristicApplied {
                    previous_value,
                    applied_value: entry.value,
                    new_value,
                },
            );
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Characteristic(applied));
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
        let AppliedState::Characteristic(records) = applied else {
            return ReverseOutcome::failed("Mismatched applied state for characteristic grant");
        };
        let mut outcome = ReverseOutcome::default();
        let mut restore = BTreeMap::new();
        let mut patch = HashMap::new();

        for (key_str, record) in records {
            let key = match Characteristic::from_str(key_str) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            // Exact inverse subtraction from the current value, so unrelated
            // later changes to the same characteristic survive.
            let new_value = actor.characteristic(key).advance - record.applied_value;
            Self::push_patch(actor, &mut patch, key, new_value);
            restore.insert(key_str.clone(), record.applied_value);
        }

        if !restore.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.restore = Some(RestoreData::Characteristic(restore));
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
        let RestoreData::Characteristic(deltas) = restore else {
            return GrantOutcome::failed("Mismatched restore data for characteristic grant");
        };
        let mut outcome = GrantOutcome::default();
        let mut applied = BTreeMap::new();
        let mut patch = HashMap::new();

        for (key_str, delta) in deltas {
            let key = match Characteristic::from_str(key_str) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            let previous_value = actor.characteristic(key).advance;
            let new_value = previous_value + delta;
            Self::push_patch(actor, &mut patch, key, new_value);
            applied.insert(
                key_str.clone(),
                CharacteristicApplied {
                    previous_value,
                    applied_value: *delta,
                    new_value,
                },
            );
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Characteristic(applied));
        }
        outcome
    }

    fn automatic_value(&self) -> Option<GrantData> {
        if self.config.optional || self.entries().iter().any(|e| e.optional) {
            return None;
        }
        Some(GrantData::with_selected(
            self.entries().iter().map(|e| e.key.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimward_domain::{CharacteristicGrantConfig, CharacteristicGrantEntry};

    use crate::use_cases::grants::testing::{failing_store_context, permissive_context};

    fn grant(entries: Vec<(&str, i32, bool)>) -> CharacteristicGrant {
        CharacteristicGrant::new(GrantConfig::new(GrantKind::Characteristic(
            CharacteristicGrantConfig {
                characteristics: entries
                    .into_iter()
                    .map(|(key, value, optional)| CharacteristicGrantEntry {
                        key: key.to_string(),
                        value,
                        optional,
                    })
                    .collect(),
            },
        )))
    }

    #[tokio::test]
    async fn test_apply_records_previous_applied_new() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("toughness", 2, false)]);

        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;

        assert!(outcome.success());
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
        let Some(AppliedState::Characteristic(applied)) = outcome.applied else {
            panic!("expected characteristic applied state");
        };
        let record = &applied["toughness"];
        assert_eq!(record.previous_value, 0);
        assert_eq!(record.applied_value, 2);
        assert_eq!(record.new_value, 2);
    }

    #[tokio::test]
    async fn test_reverse_is_exact_inverse() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        actor.set_characteristic_advance(Characteristic::Agility, 5);
        let grant = grant(vec![("agility", 3, false)]);

        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert_eq!(actor.characteristic(Characteristic::Agility).advance, 8);

        // An unrelated change after apply must survive reversal.
        actor.set_characteristic_advance(Characteristic::Agility, 10);
        let applied = outcome.applied.expect("applied");
        let reversed = grant
            .reverse(&ctx, &mut actor, &applied, ApplyOptions::default())
            .await;
        assert!(reversed.success());
        assert_eq!(actor.characteristic(Characteristic::Agility).advance, 7);
    }

    #[tokio::test]
    async fn test_restore_reapplies_delta() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("toughness", 2, false)]);

        let applied = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await
            .applied
            .expect("applied");
        let restore_data = grant
            .reverse(&ctx, &mut actor, &applied, ApplyOptions::default())
            .await
            .restore
            .expect("restore");
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 0);

        let restored = grant
            .restore(&ctx, &mut actor, &restore_data, ApplyOptions::restoring())
            .await;
        assert!(restored.success());
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
    }

    #[tokio::test]
    async fn test_unknown_key_is_error_but_siblings_apply() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("luck", 2, false), ("toughness", 1, false)]);

        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 1);
    }

    #[tokio::test]
    async fn test_required_entry_missing_from_selection_is_error() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("toughness", 2, false), ("agility", 1, true)]);

        let data = GrantData::with_selected(Vec::<String>::new());
        let outcome = grant
            .apply(&ctx, &mut actor, &data, ApplyOptions::default())
            .await;
        // Required toughness errors; optional agility is silently skipped.
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("toughness"));
        assert!(outcome.applied.is_none());
    }

    #[tokio::test]
    async fn test_prior_identical_application_is_noop() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("toughness", 2, false)]);

        let first = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        let data = GrantData {
            prior: first.applied,
            ..GrantData::default()
        };
        let second = grant
            .apply(&ctx, &mut actor, &data, ApplyOptions::default())
            .await;
        assert!(second.success());
        assert!(second.applied.is_none());
        assert_eq!(second.notifications.len(), 1);
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
    }

    #[tokio::test]
    async fn test_dry_run_mutates_actor_but_not_store() {
        // The failing store proves no persistence call is made.
        let ctx = failing_store_context();
        let mut actor = Actor::new("Acolyte");
        let grant = grant(vec![("toughness", 2, false)]);

        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::dry_run())
            .await;
        assert!(outcome.success());
        assert_eq!(actor.characteristic(Characteristic::Toughness).advance, 2);
    }

    #[test]
    fn test_automatic_value_covers_all_required_entries() {
        let grant = grant(vec![("toughness", 2, false), ("agility", 1, false)]);
        let data = grant.automatic_value().expect("automatic");
        assert!(data.is_selected("toughness"));
        assert!(data.is_selected("agility"));

        let grant = grant_with_optional();
        assert!(grant.automatic_value().is_none());
    }

    fn grant_with_optional() -> CharacteristicGrant {
        grant(vec![("toughness", 2, true)])
    }
}
