//! Live-database tooling for the strata migration engine.
//!
//! `strata-migrate` wraps the pure [`strata_core`] pipeline with
//! everything that touches the outside world:
//!
//! - **Introspection**: reads a PostgreSQL, MySQL, or SQLite database's
//!   catalog into the normalized schema model ([`introspect`]).
//! - **Runner**: applies generated migrations transactionally and tracks
//!   them in a bookkeeping table ([`executor`], [`history`]).
//! - **Writer**: renders generated SQL into numbered
//!   `.up.sql`/`.down.sql` file pairs ([`writer`]).
//! - **Validator**: lints migration file text before anyone runs it
//!   ([`validate`]).
//! - **Loader**: reads a declarative JSON schema as the desired state
//!   ([`loader`]).
//!
//! The `strata-migrate` binary ties these together:
//!
//! ```bash
//! # Show the SQL needed to reach the declared schema
//! strata-migrate diff --schema schema.json
//!
//! # Write it as a migration file pair
//! strata-migrate make-migration --schema schema.json --name add_posts
//!
//! # Apply pending migrations
//! strata-migrate migrate
//!
//! # Roll back the last one
//! strata-migrate migrate --revert --count 1
//! ```

pub mod db;
pub mod error;
pub mod executor;
pub mod history;
pub mod introspect;
pub mod loader;
pub mod validate;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::db::DbPool;
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{discover_migrations, MigrationFile, MigrationRunner};
    pub use crate::history::{AppliedMigration, MigrationHistory};
    pub use crate::introspect::Introspector;
    pub use crate::loader::load_schema;
    pub use crate::validate::{validate_dir, validate_migration, Severity, ValidationIssue};
    pub use crate::writer::MigrationWriter;
}

/// Default name of the migration bookkeeping table.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "strata_migrations";
