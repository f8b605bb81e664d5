//! Core error types for mazoezi-core.
//!
//! This module defines the error hierarchy using thiserror. Absent records are
//! never errors (they default to empty structures); errors are reserved for
//! storage failures, bad configuration, invalid caller input and rejected
//! backup payloads.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mazoezi-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backup import/export errors
    #[error("{0}")]
    Snapshot(#[from] SnapshotError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Stored document could not be decoded
    #[error("Corrupt record '{key}': {message}")]
    CorruptRecord { key: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// No challenge has been started for this profile
    #[error("No active challenge; start one first")]
    NoActiveChallenge,

    /// Standard id is not part of the active challenge
    #[error("Unknown standard '{0}' for the active challenge")]
    UnknownStandard(String),

    /// A challenge is already running
    #[error("Challenge '{0}' is in progress; switch challenges to replace it")]
    ChallengeInProgress(String),

    /// Challenge template id is not in the catalog
    #[error("Unknown challenge '{0}'")]
    UnknownChallenge(String),

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Backup payload errors. Surfaced to the user as a single message.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Payload is not JSON, or does not have the expected shape
    #[error("Invalid backup file: {0}")]
    Invalid(String),

    /// Payload lacks one of the expected top-level keys
    #[error("Invalid backup file: missing '{0}'")]
    MissingKey(&'static str),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_errors_read_as_single_user_message() {
        let err: CoreError = SnapshotError::MissingKey("profile").into();
        assert_eq!(err.to_string(), "Invalid backup file: missing 'profile'");
    }

    #[test]
    fn rusqlite_errors_map_to_query_failures() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
