//! Progress engine: one `/add` worth of state changes.
//!
//! An increment runs under a per-user mutex and composes atomic store calls:
//! ensure the user, read the count, maybe let a caterpillar eat stitches,
//! add the new stitches, then grant one flower per threshold crossed.
//!
//! The flower count is computed against the count *after* the caterpillar.
//! Using the pre-penalty value would undercount when the penalty drops the
//! user below a boundary that the increment then crosses again. When the
//! bouquet holds fewer flowers than the total has ever earned (an earlier
//! grant failed halfway), the larger of the two counts is granted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, Stage, StorageError, ValidationError};
use crate::reward::{pick_flower, roll_caterpillar, Chance, RandomChance, RewardPolicy, CATERPILLAR_PENALTY};
use crate::storage::{RecordStore, UserId};

/// Normalized `/add` request coming from a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementRequest {
    pub user_id: UserId,
    pub display_name: String,
    pub amount: u64,
    /// Transport message id used for duplicate suppression.
    pub request_id: i64,
}

/// What one increment did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub added: u64,
    /// Stitch total after the increment.
    pub stitches: u64,
    /// A caterpillar ate stitches before the increment.
    pub caterpillar: bool,
    pub caterpillars: u64,
    pub flowers_granted: u64,
    pub new_flowers: Vec<String>,
    /// Every flower owned, in grant order.
    pub bouquet: Vec<String>,
}

/// Applies increments against a [`RecordStore`].
pub struct ProgressEngine<S, C = RandomChance> {
    store: S,
    policy: RewardPolicy,
    chance: Mutex<C>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S: RecordStore, C: Chance> ProgressEngine<S, C> {
    pub fn new(store: S, policy: RewardPolicy, chance: C) -> Self {
        Self {
            store,
            policy,
            chance: Mutex::new(chance),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> RewardPolicy {
        self.policy
    }

    /// Run one increment to completion.
    ///
    /// # Errors
    /// [`EngineError::Validation`] for a zero or oversized amount (nothing is
    /// written). [`EngineError::Aborted`] when a store call fails; steps
    /// already applied stay applied, and no success is reported.
    pub fn increment(&self, request: &IncrementRequest) -> Result<IncrementSummary, EngineError> {
        let user_id = request.user_id;
        if request.amount == 0 {
            warn!(user_id, "rejected non-positive stitch amount");
            return Err(ValidationError::NonPositiveAmount.into());
        }
        let too_large = || ValidationError::AmountTooLarge {
            raw: request.amount.to_string(),
        };
        let delta = i64::try_from(request.amount).map_err(|_| too_large())?;

        let lock = self.user_lock(user_id);
        let result = {
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.apply(request, delta)
        };
        drop(lock);
        self.release_lock(user_id);
        result
    }

    /// The increment body; the caller holds the user's lock.
    fn apply(&self, request: &IncrementRequest, delta: i64) -> Result<IncrementSummary, EngineError> {
        let user_id = request.user_id;
        let too_large = || ValidationError::AmountTooLarge {
            raw: request.amount.to_string(),
        };
        let abort = |stage: Stage| move |source: StorageError| EngineError::Aborted {
            user_id,
            stage,
            source,
        };

        self.store
            .ensure_user(user_id, &request.display_name)
            .map_err(abort(Stage::EnsureUser))?;
        let user = self
            .store
            .get_user(user_id)
            .map_err(abort(Stage::ReadUser))?
            .ok_or_else(|| abort(Stage::ReadUser)(StorageError::UnknownUser(user_id)))?;

        let mut before = user.stitch_count;
        if before
            .checked_add(request.amount)
            .map_or(true, |total| i64::try_from(total).is_err())
        {
            return Err(too_large().into());
        }

        let mut caterpillars = user.caterpillar_count;
        let caterpillar = roll_caterpillar(&mut *self.chance());
        if caterpillar {
            let stored = self
                .store
                .adjust_stitches(user_id, -(CATERPILLAR_PENALTY as i64))
                .map_err(abort(Stage::Penalty))?;
            caterpillars = self
                .store
                .increment_caterpillars(user_id)
                .map_err(abort(Stage::Penalty))?;
            before = reconcile(user_id, Stage::Penalty, before.saturating_sub(CATERPILLAR_PENALTY), stored);
            info!(user_id, stitches = before, "caterpillar ate {CATERPILLAR_PENALTY} stitches");
        }

        let stored = self
            .store
            .adjust_stitches(user_id, delta)
            .map_err(abort(Stage::Increment))?;
        let after = reconcile(user_id, Stage::Increment, before + request.amount, stored);
        info!(user_id, added = request.amount, stitches = after, "stitches added");

        let mut owned = self
            .store
            .list_flowers(user_id)
            .map_err(abort(Stage::Flowers))?
            .len();
        // A grant interrupted earlier leaves the bouquet short of the total.
        let missing = self.policy.flowers_earned(after, 0).saturating_sub(owned as u64);
        let earned = self.policy.flowers_earned(after, before).max(missing);
        if missing > 0 {
            warn!(user_id, missing, owned, "restoring flowers lost to an earlier failure");
        }
        let mut new_flowers = Vec::new();
        if earned > 0 {
            for _ in 0..earned {
                let flower = pick_flower(&mut *self.chance(), owned);
                self.store
                    .append_flower(user_id, flower)
                    .map_err(abort(Stage::Flowers))?;
                new_flowers.push(flower.to_string());
                owned += 1;
            }
            info!(user_id, count = earned, flowers = %new_flowers.join(" "), "flowers granted");
        }

        let bouquet = self
            .store
            .list_flowers(user_id)
            .map_err(abort(Stage::Bouquet))?;

        Ok(IncrementSummary {
            user_id,
            display_name: request.display_name.clone(),
            added: request.amount,
            stitches: after,
            caterpillar,
            caterpillars,
            flowers_granted: earned,
            new_flowers,
            bouquet,
        })
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// Forget the user's lock once no other increment holds a handle to it.
    fn release_lock(&self, user_id: UserId) {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&user_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&user_id);
        }
    }

    fn chance(&self) -> MutexGuard<'_, C> {
        self.chance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The store is authoritative; a mismatch means something outside the
/// engine touched the row (e.g. a reset mid-increment).
fn reconcile(user_id: UserId, stage: Stage, expected: u64, stored: u64) -> u64 {
    if expected != stored {
        warn!(user_id, %stage, expected, stored, "stitch count diverged from store");
    }
    stored
}
