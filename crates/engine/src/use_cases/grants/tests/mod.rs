//! End-to-end grant flows over the real in-memory adapters.


use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use grimward_domain::{DiceExpression, EntityKind, ItemTemplate};

use crate::infrastructure::memory::{InMemoryActorStore, StaticResolver};
use crate::infrastructure::notify::CollectingNotifier;
use crate::infrastructure::ports::{ActorStore, DiceError, DiceRoller, NotificationSink};
use crate::use_cases::grants::GrantsManager;

/// Replays a fixed script of die results in order. `roll` feeds the script
/// through the expression one die at a time; `roll_d10` consumes one entry.
pub(crate) struct ScriptedRoller {
    script: Mutex<VecDeque<i32>>,
}

impl ScriptedRoller {
    pub(crate) fn new(script: impl IntoIterator<Item = i32>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    fn next(&self) -> Result<i32, DiceError> {
        self.script
            .lock()
            .map_err(|_| DiceError::RollFailed("dice script lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| DiceError::RollFailed("dice script exhausted".to_string()))
    }
}

#[async_trait]
impl DiceRoller for ScriptedRoller {
    async fn roll(&self, expression: &DiceExpression) -> Result<i32, DiceError> {
        let mut failure = None;
        let breakdown = expression.roll_with(&mut |_| match self.next() {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                0
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(breakdown.total),
        }
    }

    async fn roll_d10(&self) -> Result<i32, DiceError> {
        self.next()
    }
}

pub(crate) struct Harness {
    pub store: Arc<InMemoryActorStore>,
    pub notifier: Arc<CollectingNotifier>,
    pub manager: GrantsManager,
}

/// Route engine tracing to the test output; later calls are no-ops.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grimward_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub(crate) fn harness(
    resolver: StaticResolver,
    script: impl IntoIterator<Item = i32>,
) -> Harness {
    init_tracing();
    let store = Arc::new(InMemoryActorStore::new());
    let notifier = Arc::new(CollectingNotifier::new());
    let manager = GrantsManager::new(
        Arc::clone(&store) as Arc<dyn ActorStore>,
        Arc::new(resolver),
        Arc::new(ScriptedRoller::new(script)),
        Arc::clone(&notifier) as Arc<dyn NotificationSink>,
    );
    Harness {
        store,
        notifier,
        manager,
    }
}

pub(crate) fn template(reference: &str, kind: EntityKind, name: &str) -> ItemTemplate {
    ItemTemplate {
        reference: reference.to_string(),
        kind,
        name: name.to_string(),
        specialization: None,
        data: serde_json::json!({}),
        grants: Vec::new(),
    }
}
