//! Record store contract.
//!
//! The store is the only shared mutable resource in the garden. Each method
//! is atomic on its own; the progress engine composes several calls and
//! relies on them being monotonic (insert-if-absent, floored adjustments,
//! append-only flowers) rather than on a cross-call transaction.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Stable chat user identifier.
pub type UserId = i64;

/// Per-user counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub stitch_count: u64,
    pub caterpillar_count: u64,
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub display_name: String,
    pub stitch_count: u64,
    /// Space-joined flowers in grant order.
    pub bouquet: String,
}

/// Tabular dump with column headers, ready for CSV rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Row counts removed by a full reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub deleted_users: usize,
    pub deleted_flowers: usize,
}

/// Durable storage of users and their flowers.
pub trait RecordStore: Send + Sync {
    /// Insert a user with zeroed counters. No-op if the user exists.
    fn ensure_user(&self, user_id: UserId, display_name: &str) -> Result<(), StorageError>;

    fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StorageError>;

    /// Apply `stitches = max(0, stitches + delta)` and return the stored value.
    fn adjust_stitches(&self, user_id: UserId, delta: i64) -> Result<u64, StorageError>;

    /// Bump the caterpillar counter and return the new value.
    fn increment_caterpillars(&self, user_id: UserId) -> Result<u64, StorageError>;

    fn append_flower(&self, user_id: UserId, flower: &str) -> Result<(), StorageError>;

    /// Flowers in grant order.
    fn list_flowers(&self, user_id: UserId) -> Result<Vec<String>, StorageError>;

    /// Users by stitch count descending; ties keep insertion order.
    fn top_users(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StorageError>;

    /// Every user with their bouquet, in insertion order.
    fn all_users(&self) -> Result<Vec<(UserRecord, Vec<String>)>, StorageError>;

    /// Raw dump of the users table with its column names.
    fn all_users_with_headers(&self) -> Result<ExportTable, StorageError>;

    /// Delete every user and flower in one transaction.
    fn reset_all(&self) -> Result<ResetSummary, StorageError>;
}
