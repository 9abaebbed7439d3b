//! Choice grant - forced selections among option bundles of nested grants.
//!
//! The only structurally recursive variant: each option carries full nested
//! grant configurations dispatched back through the factory.

use std::collections::BTreeMap;

use async_trait::async_trait;

use grimward_domain::{
    selection_key, Actor, AppliedState, ChoiceApplied, ChoiceGrantConfig, ChoiceOption,
    ChoiceRestore, GrantConfig, GrantKind, RestoreData,
};

use super::behavior::GrantBehavior;
use super::factory::create_grant;
use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

pub struct ChoiceGrant {
    config: GrantConfig,
}

impl ChoiceGrant {
    pub fn new(config: GrantConfig) -> Self {
        Self { config }
    }

    fn choice(&self) -> Option<&ChoiceGrantConfig> {
        match &self.config.kind {
            GrantKind::Choice(config) => Some(config),
            _ => None,
        }
    }

    /// Interactive data for one nested grant: the caller's slice if
    /// supplied, the automatic value otherwise, and an empty selection as
    /// the last resort (so required nested entries surface as errors).
    fn nested_data(
        behavior: &dyn GrantBehavior,
        nested: &GrantConfig,
        data: &GrantData,
    ) -> GrantData {
        data.sub_grants
            .get(&nested.id)
            .cloned()
            .or_else(|| behavior.automatic_value())
            .unwrap_or_else(|| GrantData::with_selected(Vec::<String>::new()))
    }

    /// Recover the option label from a stored `"label:index"` selection key.
    fn label_of(selection: &str) -> &str {
        selection
            .rsplit_once(':')
            .map(|(label, _)| label)
            .unwrap_or(selection)
    }

    fn option_for<'a>(
        config: &'a ChoiceGrantConfig,
        label: &str,
        errors: &mut Vec<String>,
    ) -> Option<&'a ChoiceOption> {
        let option = config.option(label);
        if option.is_none() {
            errors.push(format!("Unknown choice option '{}'", label));
        }
        option
    }
}

#[async_trait]
impl GrantBehavior for ChoiceGrant {
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
        let Some(config) = self.choice() else {
            return GrantOutcome::failed("Mismatched configuration for choice grant");
        };
        let selected = data.selected.clone().unwrap_or_default();

        if selected.is_empty() && self.config.optional {
            let message = format!(
                "Optional choice '{}' skipped",
                self.config.label.as_deref().unwrap_or("unnamed")
            );
            ctx.notify(&message);
            return GrantOutcome {
                applied: None,
                notifications: vec![message],
                errors: Vec::new(),
            };
        }
        // A selection-count failure aborts the whole grant: partial choice
        // application is meaningless.
        if (selected.len() as u32) < config.count {
            return GrantOutcome::failed(format!(
                "Choice requires {} selection(s), got {}",
                config.count,
                selected.len()
            ));
        }
        if !config.allow_duplicates {
            let mut seen = Vec::new();
            for label in &selected {
                if seen.contains(&label) {
                    return GrantOutcome::failed(format!(
                        "Option '{}' was selected more than once",
                        label
                    ));
                }
                seen.push(label);
            }
        }

        let mut outcome = GrantOutcome::default();
        let mut choice_applied = ChoiceApplied {
            selected_options: selected.clone(),
            grant_results: BTreeMap::new(),
        };

        for (index, label) in selected.iter().enumerate() {
            let Some(option) = Self::option_for(config, label, &mut outcome.errors) else {
                continue;
            };
            let mut results = BTreeMap::new();
            for nested in &option.grants {
                let behavior = create_grant(nested.clone());
                let nested_data = Self::nested_data(behavior.as_ref(), nested, data);
                let nested_outcome = behavior.apply(ctx, actor, &nested_data, options).await;
                if let Some(applied) = nested_outcome.applied {
                    results.insert(nested.id.to_string(), applied);
                }
                outcome.notifications.extend(nested_outcome.notifications);
                outcome
                    .errors
                    .extend(nested_outcome.errors.into_iter().map(|e| {
                        format!("Option '{}': {}", label, e)
                    }));
            }
            if !results.is_empty() {
                choice_applied
                    .grant_results
                    .insert(selection_key(label, index), results);
            }
        }

        if !choice_applied.grant_results.is_empty() {
            outcome.applied = Some(AppliedState::Choice(choice_applied));
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
        let Some(config) = self.choice() else {
            return ReverseOutcome::failed("Mismatched configuration for choice grant");
        };
        let AppliedState::Choice(choice) = applied else {
            return ReverseOutcome::failed("Mismatched applied state for choice grant");
        };
        let mut outcome = ReverseOutcome::default();
        let mut restore = ChoiceRestore {
            selected_options: choice.selected_options.clone(),
            grants: BTreeMap::new(),
        };

        for (selection, results) in choice.grant_results.iter().rev() {
            let label = Self::label_of(selection);
            let Some(option) = Self::option_for(config, label, &mut outcome.errors) else {
                continue;
            };
            let mut restored = BTreeMap::new();
            for nested in option.grants.iter().rev() {
                let Some(state) = results.get(&nested.id.to_string()) else {
                    continue;
                };
                let behavior = create_grant(nested.clone());
                let nested_outcome = behavior.reverse(ctx, actor, state, options).await;
                if let Some(data) = nested_outcome.restore {
                    restored.insert(nested.id.to_string(), data);
                }
                outcome.notifications.extend(nested_outcome.notifications);
                outcome
                    .errors
                    .extend(nested_outcome.errors.into_iter().map(|e| {
                        format!("Option '{}': {}", label, e)
                    }));
            }
            if !restored.is_empty() {
                restore.grants.insert(selection.clone(), restored);
            }
        }

        if !restore.grants.is_empty() {
            outcome.restore = Some(RestoreData::Choice(restore));
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
        let Some(config) = self.choice() else {
            return GrantOutcome::failed("Mismatched configuration for choice grant");
        };
        let RestoreData::Choice(choice) = restore else {
            return GrantOutcome::failed("Mismatched restore data for choice grant");
        };
        let mut outcome = GrantOutcome::default();
        let mut choice_applied = ChoiceApplied {
            selected_options: choice.selected_options.clone(),
            grant_results: BTreeMap::new(),
        };

        for (selection, stored) in &choice.grants {
            let label = Self::label_of(selection);
            let Some(option) = Self::option_for(config, label, &mut outcome.errors) else {
                continue;
            };
            let mut results = BTreeMap::new();
            for nested in &option.grants {
                let Some(data) = stored.get(&nested.id.to_string()) else {
                    continue;
                };
                let behavior = create_grant(nested.clone());
                let nested_outcome = behavior.restore(ctx, actor, data, options).await;
                if let Some(applied) = nested_outcome.applied {
                    results.insert(nested.id.to_string(), applied);
                }
                outcome.notifications.extend(nested_outcome.notifications);
                outcome
                    .errors
                    .extend(nested_outcome.errors.into_iter().map(|e| {
                        format!("Option '{}': {}", label, e)
                    }));
            }
            if !results.is_empty() {
                choice_applied.grant_results.insert(selection.clone(), results);
            }
        }

        if !choice_applied.grant_results.is_empty() {
            outcome.applied = Some(AppliedState::Choice(choice_applied));
        }
        outcome
    }

    /// A choice is always interactive by definition.
    fn automatic_value(&self) -> Option<GrantData> {
        None
    }
}
