//! Shared mock plumbing for variant unit tests.

use std::sync::Arc;

use grimward_domain::EntityId;

use crate::infrastructure::notify::CollectingNotifier;
use crate::infrastructure::ports::{MockActorStore, MockDiceRoller, MockReferenceResolver};

use super::types::GrantContext;

/// Wire mocks into a context. Pass mocks with expectations already set.
pub(crate) fn context(
    store: MockActorStore,
    resolver: MockReferenceResolver,
    dice: MockDiceRoller,
) -> GrantContext {
    GrantContext {
        store: Arc::new(store),
        resolver: Arc::new(resolver),
        dice: Arc::new(dice),
        notifier: Arc::new(CollectingNotifier::new()),
        source_item: EntityId::new(),
    }
}

/// Context whose store accepts every call. The resolver and roller carry no
/// expectations, so touching them fails the test.
pub(crate) fn permissive_context() -> GrantContext {
    let mut store = MockActorStore::new();
    store.expect_update().returning(|_, _| Ok(()));
    store
        .expect_create_embedded()
        .returning(|_, entities| Ok(entities));
    store.expect_delete_embedded().returning(|_, _| Ok(()));
    context(store, MockReferenceResolver::new(), MockDiceRoller::new())
}

/// Context whose store carries no expectations at all: any persistence call
/// fails the test. Used to prove dry runs never touch the store.
pub(crate) fn failing_store_context() -> GrantContext {
    context(
        MockActorStore::new(),
        MockReferenceResolver::new(),
        MockDiceRoller::new(),
    )
}
