//! Public entry points of the core.
//!
//! [`Garden`] ties the duplicate filter to the progress engine and exposes
//! the read-only views (leaderboard, export, backup) plus the admin reset.
//! It knows nothing about chat protocols.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::engine::{IncrementRequest, IncrementSummary, ProgressEngine};
use crate::error::{CoreError, EngineError, StorageError};
use crate::guard::RequestGuard;
use crate::reward::{Chance, RandomChance, RewardPolicy};
use crate::storage::{
    Config, Database, ExportTable, LeaderboardRow, RecordStore, ResetSummary, UserId, UserRecord,
};

/// Leaderboard size when none is requested.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Column headers of [`Garden::full_export`].
pub const EXPORT_HEADERS: [&str; 4] = ["№", "Name", "Stitches", "Flowers"];

/// Result of submitting an increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IncrementOutcome {
    Applied(IncrementSummary),
    /// The request id was already processed; nothing changed.
    Duplicate,
}

/// A user together with their bouquet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub record: UserRecord,
    pub bouquet: Vec<String>,
}

pub struct Garden<S = Database, C = RandomChance> {
    engine: ProgressEngine<S, C>,
    guard: RequestGuard,
    leaderboard_limit: usize,
}

impl Garden<Database, RandomChance> {
    /// Open the configured database with an entropy-seeded random source.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        config.validate()?;
        let store = Database::open_at(config.database_path()?)?;
        let policy = RewardPolicy::new(config.garden.flower_threshold)?;
        let engine = ProgressEngine::new(store, policy, RandomChance::from_entropy());
        Ok(Self::new(engine, RequestGuard::default()).with_leaderboard_limit(config.garden.leaderboard_limit))
    }
}

impl<S: RecordStore, C: Chance> Garden<S, C> {
    pub fn new(engine: ProgressEngine<S, C>, guard: RequestGuard) -> Self {
        Self {
            engine,
            guard,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }

    pub fn with_leaderboard_limit(mut self, limit: usize) -> Self {
        self.leaderboard_limit = limit.max(1);
        self
    }

    pub fn engine(&self) -> &ProgressEngine<S, C> {
        &self.engine
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    /// Pass a non-increment request id through the duplicate filter.
    pub fn admit(&self, request_id: i64) -> bool {
        self.guard.admit(request_id)
    }

    /// Apply an increment unless its request id was already seen.
    ///
    /// The id is recorded before the engine runs, so a request that fails is
    /// not retried under the same id.
    pub fn increment(&self, request: &IncrementRequest) -> Result<IncrementOutcome, EngineError> {
        if !self.guard.admit(request.request_id) {
            debug!(request_id = request.request_id, user_id = request.user_id, "duplicate increment ignored");
            return Ok(IncrementOutcome::Duplicate);
        }

        match self.engine.increment(request) {
            Ok(summary) => Ok(IncrementOutcome::Applied(summary)),
            Err(err) => {
                if matches!(err, EngineError::Aborted { .. }) {
                    error!(request_id = request.request_id, error = %err, "increment failed");
                }
                Err(err)
            }
        }
    }

    /// Top gardeners; `None` uses the configured limit.
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardRow>, StorageError> {
        self.store()
            .top_users(limit.unwrap_or(self.leaderboard_limit))
            .inspect_err(|err| error!(error = %err, "leaderboard query failed"))
    }

    pub fn user(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let Some(record) = self.store().get_user(user_id)? else {
            return Ok(None);
        };
        let bouquet = self.store().list_flowers(user_id)?;
        Ok(Some(UserProfile { record, bouquet }))
    }

    /// Numbered table of every gardener: index, name, stitches, flowers.
    pub fn full_export(&self) -> Result<ExportTable, StorageError> {
        let rows = self
            .store()
            .all_users()?
            .into_iter()
            .enumerate()
            .map(|(index, (user, flowers))| {
                vec![
                    (index + 1).to_string(),
                    user.display_name,
                    user.stitch_count.to_string(),
                    flowers.join(" "),
                ]
            })
            .collect();
        Ok(ExportTable {
            headers: EXPORT_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        })
    }

    /// Raw users table, column names as stored.
    pub fn backup(&self) -> Result<ExportTable, StorageError> {
        self.store()
            .all_users_with_headers()
            .inspect_err(|err| error!(error = %err, "backup query failed"))
    }

    /// Wipe every user and flower.
    pub fn reset_all(&self) -> Result<ResetSummary, StorageError> {
        let summary = self.store().reset_all()?;
        info!(
            users = summary.deleted_users,
            flowers = summary.deleted_flowers,
            "garden reset"
        );
        Ok(summary)
    }
}
