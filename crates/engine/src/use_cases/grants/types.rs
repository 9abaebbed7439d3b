//! Shared types for the grant engine: apply options, interactive data,
//! per-grant outcomes, and the aggregate results the manager returns.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use grimward_domain::{AppliedState, EntityId, GrantId, ResourceType, RestoreData};

use crate::infrastructure::ports::{ActorStore, DiceRoller, NotificationSink, ReferenceResolver};

/// Flags controlling a single apply/reverse pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Compute the full result without persisting anything.
    pub dry_run: bool,
    /// The call originates from `restore()`.
    pub restore: bool,
}

impl ApplyOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            restore: false,
        }
    }

    pub fn restoring() -> Self {
        Self {
            dry_run: false,
            restore: true,
        }
    }
}

/// Interactive input for one grant.
#[derive(Debug, Clone, Default)]
pub struct GrantData {
    /// Which sub-entries to grant, by variant-specific key (item reference
    /// id, skill key, characteristic key, resource type, or option label).
    /// `None` means unfiltered: every configured entry is granted.
    pub selected: Option<Vec<String>>,
    /// Pre-rolled resource values supplied out-of-band; used verbatim
    /// instead of re-evaluating the formula.
    pub rolled_values: BTreeMap<ResourceType, i32>,
    /// Per-nested-grant data for choice grants, keyed by nested grant id.
    pub sub_grants: HashMap<GrantId, GrantData>,
    /// Applied state from a previous run of the same grant; an identical
    /// entry already recorded there makes the reapply a no-op.
    pub prior: Option<AppliedState>,
}

impl GrantData {
    pub fn with_selected<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: Some(keys.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Whether `key` passes the selection filter. An absent filter selects
    /// everything.
    pub fn is_selected(&self, key: &str) -> bool {
        match &self.selected {
            Some(keys) => keys.iter().any(|k| k == key),
            None => true,
        }
    }
}

/// Result object for one grant's apply or restore call. Errors are carried
/// here as strings, never thrown across the boundary.
#[derive(Debug, Default)]
pub struct GrantOutcome {
    /// What was applied, absent when nothing changed.
    pub applied: Option<AppliedState>,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
}

impl GrantOutcome {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            applied: None,
            notifications: Vec::new(),
            errors: vec![message.into()],
        }
    }
}

/// Result object for one grant's reverse call.
#[derive(Debug, Default)]
pub struct ReverseOutcome {
    /// Package sufficient to restore later, absent when nothing was undone.
    pub restore: Option<RestoreData>,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
}

impl ReverseOutcome {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            restore: None,
            notifications: Vec::new(),
            errors: vec![message.into()],
        }
    }
}

/// Interactive data per grant id, as supplied by the caller.
pub type GrantDataMap = HashMap<GrantId, GrantData>;

/// Applied state per grant id within one scope.
pub type AppliedMap = HashMap<GrantId, AppliedState>;

/// Applied state of grants carried by created entities, scoped by the
/// entity that carries them. Grant ids on entities are cloned from their
/// template, so two entities instantiated from one template share them;
/// only the entity id keeps their records apart.
pub type NestedAppliedMap = HashMap<EntityId, AppliedMap>;

/// Restore data per grant id within one scope.
pub type RestoreMap = HashMap<GrantId, RestoreData>;

/// Restore data of grants carried by created entities, scoped like
/// [`NestedAppliedMap`].
pub type NestedRestoreMap = HashMap<EntityId, RestoreMap>;

/// The injected capability ports plus the source item the grants being
/// processed belong to.
#[derive(Clone)]
pub struct GrantContext {
    pub store: Arc<dyn ActorStore>,
    pub resolver: Arc<dyn ReferenceResolver>,
    pub dice: Arc<dyn DiceRoller>,
    pub notifier: Arc<dyn NotificationSink>,
    /// Provenance anchor for entities created during this run.
    pub source_item: EntityId,
}

impl GrantContext {
    pub fn notify(&self, message: impl AsRef<str>) {
        self.notifier.notify(message.as_ref());
    }
}

/// Aggregate result of applying a source item's grants. Top-level grants
/// land in `applied`; grants reached through recursion land in `nested`,
/// scoped by the entity that carried them.
#[derive(Debug, Default)]
pub struct GrantRunResult {
    pub applied: AppliedMap,
    pub nested: NestedAppliedMap,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
}

impl GrantRunResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn absorb(&mut self, scope: Option<EntityId>, id: GrantId, outcome: GrantOutcome) {
        if let Some(applied) = outcome.applied {
            match scope {
                None => {
                    self.applied.insert(id, applied);
                }
                Some(entity) => {
                    self.nested.entry(entity).or_default().insert(id, applied);
                }
            }
        }
        self.notifications.extend(outcome.notifications);
        self.errors.extend(outcome.errors);
    }
}

/// Aggregate result of reversing a source item's grants, scoped like
/// [`GrantRunResult`].
#[derive(Debug, Default)]
pub struct ReverseRunResult {
    pub restore: RestoreMap,
    pub nested: NestedRestoreMap,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
}

impl ReverseRunResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn absorb(&mut self, scope: Option<EntityId>, id: GrantId, outcome: ReverseOutcome) {
        if let Some(restore) = outcome.restore {
            match scope {
                None => {
                    self.restore.insert(id, restore);
                }
                Some(entity) => {
                    self.nested.entry(entity).or_default().insert(id, restore);
                }
            }
        }
        self.notifications.extend(outcome.notifications);
        self.errors.extend(outcome.errors);
    }
}

/// Per-item results of a sequential batch application, in input order.
#[derive(Debug, Default)]
pub struct BatchRunResult {
    pub items: Vec<(EntityId, GrantRunResult)>,
}

impl BatchRunResult {
    pub fn success(&self) -> bool {
        self.items.iter().all(|(_, r)| r.success())
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .flat_map(|(_, r)| r.errors.iter().map(String::as_str))
    }
}
