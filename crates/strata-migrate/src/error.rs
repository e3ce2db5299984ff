//! Error types for the migration tool.

use std::path::PathBuf;

/// Errors that can occur while introspecting, generating, or running
/// migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Database error. Catalog-query failures during introspection and
    /// statement failures during execution surface here unchanged.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The database URL scheme does not map to a supported dialect.
    #[error("Unsupported database URL '{0}', expected postgres://, mysql://, or sqlite:")]
    UnsupportedUrl(String),

    /// IO error (reading/writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a declarative schema file.
    #[error("Schema file error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// No migrations directory found.
    #[error("Migrations directory not found: {0}")]
    MigrationsDirNotFound(PathBuf),

    /// Migration not found in the history table.
    #[error("Migration not recorded as applied: {0}")]
    MigrationNotFound(String),

    /// A migration file pair is malformed.
    #[error("Invalid migration '{name}': {message}")]
    InvalidMigration {
        /// Migration name.
        name: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
