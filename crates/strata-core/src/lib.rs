//! Schema diffing and dialect-aware DDL generation.
//!
//! `strata-core` is the pure heart of the strata migration engine:
//!
//! - **Schema model**: a normalized, dialect-agnostic description of
//!   tables, columns, indexes, and foreign keys ([`schema`]).
//! - **Differ**: compares a current and a desired [`schema::DatabaseSchema`]
//!   and emits an ordered list of typed [`change::SchemaChange`] values
//!   ([`diff`]).
//! - **SQL generator**: renders a change list into forward ("up") and
//!   exact-inverse ("down") statement sequences for PostgreSQL, MySQL, or
//!   SQLite ([`dialect`]).
//!
//! The crate performs no I/O. Where the schemas come from (a live
//! database's catalog, a declarative schema file) and what happens to the
//! generated SQL (execution, migration files) is the `strata-migrate`
//! crate's concern.
//!
//! # Example
//!
//! ```
//! use strata_core::prelude::*;
//!
//! let current = DatabaseSchema::new();
//! let desired = DatabaseSchema::new().table(
//!     TableSchema::new("users")
//!         .column(Column::new("id", SemanticType::Integer).primary_key().auto_increment())
//!         .column(Column::new("email", SemanticType::Varchar).not_null()),
//! );
//!
//! let changes = diff(&current, &desired);
//! let sql = SqlGenerator::new(Dialect::Postgres).generate(&changes);
//! assert!(sql.up_statements[0].contains("CREATE TABLE \"users\""));
//! assert_eq!(sql.down_statements[0], "DROP TABLE IF EXISTS \"users\";");
//! ```

pub mod change;
pub mod dialect;
pub mod diff;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::change::{SchemaChange, TableChange};
    pub use crate::diff::diff;
    pub use crate::dialect::{
        Dialect, MigrationSql, MySqlDialect, PostgresDialect, SqlDialect, SqlGenerator,
        SqliteDialect, UnknownDialect,
    };
    pub use crate::schema::{
        Column, DatabaseSchema, ForeignKey, Index, ReferentialAction, SemanticType, TableSchema,
    };
}
