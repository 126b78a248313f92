//! Core error types for wintergarden-core.
//!
//! This module defines the error hierarchy using thiserror. Every error is
//! local to a single request: nothing here is meant to take the process down.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::UserId;

/// Core error type for wintergarden-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Progress engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The user row does not exist (never created, or wiped by a reset)
    #[error("No record for user {0}")]
    UnknownUser(UserId),

    /// A thread panicked while holding the connection
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Step of the increment transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EnsureUser,
    ReadUser,
    Penalty,
    Increment,
    Flowers,
    Bouquet,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::EnsureUser => "ensure user",
            Stage::ReadUser => "read user",
            Stage::Penalty => "caterpillar penalty",
            Stage::Increment => "stitch increment",
            Stage::Flowers => "flower grant",
            Stage::Bouquet => "bouquet read",
        };
        f.write_str(name)
    }
}

/// Progress engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Request rejected before touching the store
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A store call failed and the increment was abandoned
    #[error("Increment for user {user_id} aborted during {stage}: {source}")]
    Aborted {
        user_id: UserId,
        stage: Stage,
        #[source]
        source: StorageError,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Dot-path key that does not exist in the schema
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// `/add` without an amount
    #[error("Missing stitch amount")]
    MissingAmount,

    /// Amount is not a plain decimal number
    #[error("Invalid stitch amount: {raw:?}")]
    InvalidAmount { raw: String },

    /// Zero stitches
    #[error("Stitch amount must be positive")]
    NonPositiveAmount,

    /// Amount does not fit the counter
    #[error("Stitch amount too large: {raw}")]
    AmountTooLarge { raw: String },

    /// Reward threshold of zero
    #[error("Flower threshold must be greater than zero")]
    InvalidThreshold,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
