//! Skill grant - monotonic upgrades on the four-level training lattice.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;

use grimward_domain::{
    Actor, AppliedState, GrantConfig, GrantKind, RestoreData, SkillApplied, SkillChange,
    SkillGrantEntry, SkillKey, TrainingLevel,
};

use super::behavior::GrantBehavior;
use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

pub struct SkillGrant {
    config: GrantConfig,
}

impl SkillGrant {
    pub fn new(config: GrantConfig) -> Self {
        Self { config }
    }

    fn entries(&self) -> &[SkillGrantEntry] {
        match &self.config.kind {
            GrantKind::Skill(config) => &config.skills,
            _ => &[],
        }
    }

    /// Applied-map sub-key: canonical key, qualified by specialization for
    /// specialist skills so two specializations of one skill never collide.
    fn applied_key(key: SkillKey, specialization: Option<&str>) -> String {
        match specialization {
            Some(spec) => format!("{}:{}", key.as_str(), spec),
            None => key.as_str().to_string(),
        }
    }

    fn patch_skill(
        actor: &Actor,
        patch: &mut HashMap<String, Value>,
        key: SkillKey,
        errors: &mut Vec<String>,
    ) {
        if let Some(state) = actor.skill(key) {
            match serde_json::to_value(state) {
                Ok(value) => {
                    patch.insert(Actor::skill_path(key), value);
                }
                Err(e) => errors.push(format!("Could not serialize skill '{}': {}", key, e)),
            }
        }
    }

    /// Re-establish one recorded skill change at `level`.
    fn set_level(actor: &mut Actor, record: &SkillApplied, level: TrainingLevel) {
        match &record.specialization {
            Some(spec) => {
                actor.upsert_specialization(record.schema_key, spec, level);
            }
            None => actor.set_simple_skill(record.schema_key, level),
        }
    }
}

#[async_trait]
impl GrantBehavior for SkillGrant {
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
            let key = match SkillKey::resolve(&entry.key) {
                Ok(key) => key,
                Err(e) => {
                    outcome.errors.push(e.to_string());
                    continue;
                }
            };
            if !data.is_selected(&entry.key) {
                if !entry.optional {
                    outcome
                        .errors
                        .push(format!("Required skill '{}' was not selected", entry.key));
                }
                continue;
            }

            let specialization = match (key.is_specialist(), &entry.specialization) {
                (true, Some(spec)) => Some(spec.as_str()),
                (true, None) => {
                    outcome.errors.push(format!(
                        "Specialist skill '{}' requires a specialization",
                        entry.key
                    ));
                    continue;
                }
                (false, Some(_)) => {
                    outcome.errors.push(format!(
                        "Skill '{}' does not take a specialization",
                        entry.key
                    ));
                    continue;
                }
                (false, None) => None,
            };

            let current = actor.skill_level(key, specialization);
            if entry.level <= current {
                let message = match specialization {
                    Some(spec) => format!(
                        "{} ({}) is already at or above {}",
                        key.display_name(),
                        spec,
                        entry.level.display_name()
                    ),
                    None => format!(
                        "{} is already at or above {}",
                        key.display_name(),
                        entry.level.display_name()
                    ),
                };
                ctx.notify(&message);
                outcome.notifications.push(message);
                continue;
            }

            let (entry_index, change) = match specialization {
                Some(spec) => {
                    let (index, created) = actor.upsert_specialization(key, spec, entry.level);
                    (
                        Some(index),
                        if created {
                            SkillChange::Created
                        } else {
                            SkillChange::Upgraded
                        },
                    )
                }
                None => {
                    actor.set_simple_skill(key, entry.level);
                    (None, SkillChange::Upgraded)
                }
            };
            Self::patch_skill(actor, &mut patch, key, &mut outcome.errors);
            applied.insert(
                Self::applied_key(key, specialization),
                SkillApplied {
                    schema_key: key,
                    specialization: specialization.map(String::from),
                    entry_index,
                    previous_level: current,
                    new_level: entry.level,
                    change,
                },
            );
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Skill(applied));
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
        let AppliedState::Skill(records) = applied else {
            return ReverseOutcome::failed("Mismatched applied state for skill grant");
        };
        let mut outcome = ReverseOutcome::default();
        let mut restore = BTreeMap::new();
        let mut patch = HashMap::new();

        for (sub_key, record) in records {
            match (record.change, &record.specialization) {
                (SkillChange::Created, Some(spec)) => {
                    if !actor.remove_specialization(record.schema_key, spec) {
                        let message = format!(
                            "{} ({}) was already removed",
                            record.schema_key.display_name(),
                            spec
                        );
                        ctx.notify(&message);
                        outcome.notifications.push(message);
                    }
                }
                (SkillChange::Created, None) => {
                    outcome.errors.push(format!(
                        "Created skill record for '{}' is missing its specialization",
                        record.schema_key
                    ));
                    continue;
                }
                (SkillChange::Upgraded, _) => {
                    Self::set_level(actor, record, record.previous_level);
                }
            }
            Self::patch_skill(actor, &mut patch, record.schema_key, &mut outcome.errors);
            restore.insert(sub_key.clone(), record.clone());
        }

        if !restore.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.restore = Some(RestoreData::Skill(restore));
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
        let RestoreData::Skill(records) = restore else {
            return GrantOutcome::failed("Mismatched restore data for skill grant");
        };
        let mut outcome = GrantOutcome::default();
        let mut applied = BTreeMap::new();
        let mut patch = HashMap::new();

        for (sub_key, record) in records {
            Self::set_level(actor, record, record.new_level);
            Self::patch_skill(actor, &mut patch, record.schema_key, &mut outcome.errors);
            applied.insert(sub_key.clone(), record.clone());
        }

        if !applied.is_empty() {
            if !options.dry_run {
                if let Err(e) = ctx.store.update(actor.id, patch).await {
                    outcome.errors.push(e.to_string());
                }
            }
            outcome.applied = Some(AppliedState::Skill(applied));
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
    use grimward_domain::SkillGrantConfig;

    use crate::use_cases::grants::testing::permissive_context;

    fn grant(entries: Vec<(&str, Option<&str>, TrainingLevel)>) -> SkillGrant {
        SkillGrant::new(GrantConfig::new(GrantKind::Skill(SkillGrantConfig {
            skills: entries
                .into_iter()
                .map(|(key, specialization, level)| SkillGrantEntry {
                    key: key.to_string(),
                    specialization: specialization.map(String::from),
                    level,
                    optional: false,
                })
                .collect(),
        })))
    }

    #[tokio::test]
    async fn test_upgrade_and_monotonic_no_downgrade() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");

        let plus10 = grant(vec![("dodge", None, TrainingLevel::Plus10)]);
        let outcome = plus10
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(
            actor.skill_level(SkillKey::Dodge, None),
            TrainingLevel::Plus10
        );

        // Lower level afterwards is a no-op with a notification.
        let trained = grant(vec![("dodge", None, TrainingLevel::Trained)]);
        let outcome = trained
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert!(outcome.applied.is_none());
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(
            actor.skill_level(SkillKey::Dodge, None),
            TrainingLevel::Plus10
        );
    }

    #[tokio::test]
    async fn test_alias_resolution_reaches_canonical_key() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");

        let grant = grant(vec![("Tech-Use", None, TrainingLevel::Trained)]);
        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(
            actor.skill_level(SkillKey::TechUse, None),
            TrainingLevel::Trained
        );
    }

    #[tokio::test]
    async fn test_unresolvable_key_is_hard_error() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");

        let grant = grant(vec![("basket weaving", None, TrainingLevel::Trained)]);
        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.applied.is_none());
    }

    #[tokio::test]
    async fn test_specialization_created_then_reversed_away() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");

        let grant = grant(vec![(
            "commonLore",
            Some("Imperium"),
            TrainingLevel::Trained,
        )]);
        let outcome = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await;
        assert!(outcome.success());
        assert_eq!(
            actor.skill_level(SkillKey::CommonLore, Some("Imperium")),
            TrainingLevel::Trained
        );
        let Some(AppliedState::Skill(records)) = &outcome.applied else {
            panic!("expected skill applied state");
        };
        assert_eq!(records["commonLore:Imperium"].change, SkillChange::Created);

        let applied = outcome.applied.expect("applied");
        let reversed = grant
            .reverse(&ctx, &mut actor, &applied, ApplyOptions::default())
            .await;
        assert!(reversed.success());
        assert_eq!(
            actor.skill_level(SkillKey::CommonLore, Some("Imperium")),
            TrainingLevel::Known
        );
    }

    #[tokio::test]
    async fn test_upgrade_reversal_restores_previous_level() {
        let ctx = permissive_context();
        let mut actor = Actor::new("Acolyte");
        actor.set_simple_skill(SkillKey::Awareness, TrainingLevel::Trained);

        let grant = grant(vec![("awareness", None, TrainingLevel::Plus20)]);
        let applied = grant
            .apply(&ctx, &mut actor, &GrantData::default(), ApplyOptions::default())
            .await
            .applied
            .expect("applied");
        assert_eq!(
            actor.skill_level(SkillKey::Awareness, None),
            TrainingLevel::Plus20
        );

        let restore_data = grant
            .reverse(&ctx, &mut actor, &applied, ApplyOptions::default())
            .await
            .restore
            .expect("restore");
        assert_eq!(
            actor.skill_level(SkillKey::Awareness, None),
            TrainingLevel::Trained
        );

        // Restore brings the upgrade back.
        let restored = grant
            .restore(&ctx, &mut actor, &restore_data, ApplyOptions::restoring())
            .await;
        assert!(restored.success());
        assert_eq!(
            actor.skill_level(SkillKey::Awareness, None),
            TrainingLevel::Plus20
        );
    }

    #[test]
    fn test_automatic_value_requires_all_entries_mandatory() {
        let auto = grant(vec![("dodge", None, TrainingLevel::Trained)])
            .automatic_value()
            .expect("automatic");
        assert!(auto.is_selected("dodge"));

        let mut config = GrantConfig::new(GrantKind::Skill(SkillGrantConfig {
            skills: vec![SkillGrantEntry {
                key: "dodge".to_string(),
                specialization: None,
                level: TrainingLevel::Trained,
                optional: true,
            }],
        }));
        config.optional = false;
        assert!(SkillGrant::new(config).automatic_value().is_none());
    }
}
