//! The contract every grant variant implements.

use async_trait::async_trait;

use grimward_domain::{Actor, AppliedState, GrantConfig, GrantSummary, RestoreData};

use super::types::{ApplyOptions, GrantContext, GrantData, GrantOutcome, ReverseOutcome};

/// One category of benefit: apply/reverse/restore algorithm, validation,
/// and a human-readable summary, all driven by an immutable configuration.
///
/// Apply and reverse never return `Err`: failures are collected as strings
/// on the outcome so sibling entries keep processing. Variants always
/// mutate the in-memory actor they are given (so sibling grants observe
/// each other) and skip every store call when `options.dry_run` is set.
#[async_trait]
pub trait GrantBehavior: Send + Sync {
    /// The immutable configuration this behavior was built from.
    fn config(&self) -> &GrantConfig;

    /// Grant the configured benefit to the actor.
    async fn apply(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        data: &GrantData,
        options: ApplyOptions,
    ) -> GrantOutcome;

    /// Exactly undo what `applied` recorded, returning a serializable
    /// package sufficient to `restore()` later.
    async fn reverse(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        applied: &AppliedState,
        options: ApplyOptions,
    ) -> ReverseOutcome;

    /// Re-grant from a reverse's restore package.
    async fn restore(
        &self,
        ctx: &GrantContext,
        actor: &mut Actor,
        restore: &RestoreData,
        options: ApplyOptions,
    ) -> GrantOutcome;

    /// A fully-specified `GrantData` covering every sub-entry, when the
    /// grant needs no interactive input; `None` when any sub-entry or the
    /// grant itself is optional, randomness is involved, or the variant is
    /// a choice.
    fn automatic_value(&self) -> Option<GrantData>;

    /// Structural validation of the configuration, independent of any actor.
    fn validate(&self) -> Vec<String> {
        self.config().validate()
    }

    /// Read-only preview for disclosure surfaces.
    fn summary(&self) -> GrantSummary {
        self.config().summary()
    }
}
