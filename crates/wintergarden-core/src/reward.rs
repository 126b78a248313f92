//! Flower and caterpillar rules.
//!
//! Everything here is pure apart from the [`Chance`] source, which callers
//! inject so that tests can script exact draws.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::error::ValidationError;

/// Stitches needed per flower unless configured otherwise.
pub const DEFAULT_FLOWER_THRESHOLD: u64 = 500;

/// Stitches eaten by a caterpillar.
pub const CATERPILLAR_PENALTY: u64 = 100;

/// Probability of a caterpillar on each increment.
pub const CATERPILLAR_PROBABILITY: f64 = 0.1;

/// Owned flowers needed before advanced flowers can bloom.
pub const RARITY_GATE: usize = 10;

/// Common flowers, available from the first grant.
pub const BASE_FLOWERS: [&str; 5] = ["🌷", "🌹", "🌸", "🌺", "🌼"];

/// Rare flowers, unlocked by [`RARITY_GATE`].
pub const ADVANCED_FLOWERS: [&str; 3] = ["🪻", "🪷", "🌻"];

/// Source of randomness for reward decisions.
pub trait Chance: Send {
    /// Bernoulli trial with the given probability.
    fn hit(&mut self, probability: f64) -> bool;

    /// Uniform index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`Chance`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomChance<R = Mcg128Xsl64> {
    rng: R,
}

impl RandomChance<Mcg128Xsl64> {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    /// Reproducible sequence for simulations and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RandomChance<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Chance for RandomChance<R> {
    fn hit(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Number of flowers earned moving from `before` to `after` stitches.
///
/// Counts threshold boundaries crossed upward. Never negative: a drop
/// (e.g. after a caterpillar) earns nothing and revokes nothing.
pub fn flowers_earned(after: u64, before: u64, threshold: u64) -> u64 {
    if threshold == 0 {
        return 0;
    }
    (after / threshold).saturating_sub(before / threshold)
}

/// Draw the next flower for a gardener who already owns `owned` flowers.
pub fn pick_flower<C: Chance + ?Sized>(chance: &mut C, owned: usize) -> &'static str {
    if owned < RARITY_GATE {
        BASE_FLOWERS[chance.pick(BASE_FLOWERS.len())]
    } else {
        let all = BASE_FLOWERS.len() + ADVANCED_FLOWERS.len();
        let index = chance.pick(all);
        BASE_FLOWERS
            .get(index)
            .copied()
            .unwrap_or_else(|| ADVANCED_FLOWERS[index - BASE_FLOWERS.len()])
    }
}

/// Whether a caterpillar shows up on this increment.
pub fn roll_caterpillar<C: Chance + ?Sized>(chance: &mut C) -> bool {
    chance.hit(CATERPILLAR_PROBABILITY)
}

/// Tunable part of the reward rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    threshold: u64,
}

impl RewardPolicy {
    /// # Errors
    /// Rejects a zero threshold.
    pub fn new(threshold: u64) -> Result<Self, ValidationError> {
        if threshold == 0 {
            return Err(ValidationError::InvalidThreshold);
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn flowers_earned(&self, after: u64, before: u64) -> u64 {
        flowers_earned(after, before, self.threshold)
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FLOWER_THRESHOLD,
        }
    }
}
