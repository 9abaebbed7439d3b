//! Grimward engine - grant application, reversal, and restoration.
//!
//! The engine orchestrates the five grant variants over narrow capability
//! ports (document store, reference resolver, random source, notification
//! sink). All host concerns stay behind those ports; everything in here is
//! concrete types driven by `grimward_domain`.

pub mod infrastructure;
pub mod use_cases;

pub use infrastructure::ports::{
    ActorStore, DiceError, DiceRoller, NotificationSink, ReferenceResolver, StoreError,
};
pub use use_cases::grants::{
    create_grant, extract_grants, migrate_legacy, source_item_from_document, AppliedMap,
    ApplyOptions, BatchRunResult, GrantBehavior, GrantContext, GrantData, GrantDataMap,
    GrantOutcome, GrantRunResult, GrantsManager, NestedAppliedMap, NestedRestoreMap,
    RestoreMap, ReverseOutcome, ReverseRunResult, MAX_DEPTH,
};
