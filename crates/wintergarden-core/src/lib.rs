//! # Winter Garden Core Library
//!
//! Business logic for the Winter Garden stitch tracker. Gardeners report
//! stitches from a chat; every threshold crossed grows a random flower in
//! their bouquet, and now and then a caterpillar eats some progress.
//!
//! ## Architecture
//!
//! - **Record Store**: SQLite-backed users and flowers behind the
//!   [`RecordStore`] trait
//! - **Reward Policy**: threshold arithmetic, rarity-gated flower draws and
//!   caterpillar rolls over an injectable [`Chance`] source
//! - **Progress Engine**: the per-user increment transaction
//! - **Request Guard**: best-effort duplicate message filter
//! - **Garden**: the public API combining the above
//! - **Bot**: chat command parsing, access control and reply templates
//!
//! ## Key Components
//!
//! - [`Garden`]: increment, leaderboard, export, backup, reset
//! - [`ProgressEngine`]: increment transaction
//! - [`Database`]: SQLite record store
//! - [`Config`]: TOML configuration

pub mod bot;
pub mod engine;
pub mod error;
pub mod export;
pub mod garden;
pub mod guard;
pub mod reward;
pub mod storage;

pub use engine::{IncrementRequest, IncrementSummary, ProgressEngine};
pub use error::{ConfigError, CoreError, EngineError, StorageError, ValidationError};
pub use garden::{Garden, IncrementOutcome, UserProfile};
pub use guard::RequestGuard;
pub use reward::{Chance, RandomChance, RewardPolicy};
pub use storage::{Config, Database, ExportTable, LeaderboardRow, RecordStore, UserId, UserRecord};
