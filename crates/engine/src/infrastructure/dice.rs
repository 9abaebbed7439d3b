//! Default random source backed by `rand`.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use grimward_domain::DiceExpression;

use super::ports::{DiceError, DiceRoller};

/// Seedable roller over a standard RNG. Seed it in tests for determinism;
/// production callers use `new()`.
pub struct RngDiceRoller {
    rng: Mutex<StdRng>,
}

impl RngDiceRoller {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, DiceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| DiceError::RollFailed("rng mutex poisoned".to_string()))?;
        Ok(f(&mut rng))
    }
}

impl Default for RngDiceRoller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiceRoller for RngDiceRoller {
    async fn roll(&self, expression: &DiceExpression) -> Result<i32, DiceError> {
        self.with_rng(|rng| {
            expression
                .roll_with(&mut |size| rng.gen_range(1..=size as i32))
                .total
        })
    }

    async fn roll_d10(&self) -> Result<i32, DiceError> {
        self.with_rng(|rng| rng.gen_range(1..=10))
    }
}
