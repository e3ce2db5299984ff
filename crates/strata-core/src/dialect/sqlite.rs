//! SQLite dialect.
//!
//! SQLite's ALTER TABLE is limited to renames and column additions in
//! this engine's design: dropping or altering a column and adding or
//! dropping a foreign key after table creation all render as explanatory
//! comments rather than invalid SQL, so callers can see what must be
//! migrated manually.

use super::SqlDialect;
use crate::schema::{Column, ForeignKey, Index, SemanticType};

/// SQLite DDL renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_sql(&self, ty: &SemanticType) -> String {
        // SQLite has type affinity rather than strict types.
        match ty {
            SemanticType::Integer | SemanticType::BigInt | SemanticType::Boolean => {
                "INTEGER".to_string()
            }
            SemanticType::Varchar
            | SemanticType::Text
            | SemanticType::Timestamp
            | SemanticType::Json => "TEXT".to_string(),
            SemanticType::Decimal => "REAL".to_string(),
            SemanticType::Other(name) => name.to_uppercase(),
        }
    }

    fn column_definition(&self, col: &Column, single_pk: bool) -> String {
        // The rowid alias form replaces the declared type entirely.
        if col.auto_increment {
            return format!(
                "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                self.quote_identifier(&col.name)
            );
        }
        self.generic_column_definition(col, single_pk)
    }

    fn drop_column(&self, table: &str, col: &Column) -> String {
        format!(
            "-- SQLite does not support dropping column {}.{}; manual migration required",
            table, col.name
        )
    }

    fn modify_column(&self, table: &str, target: &Column) -> String {
        format!(
            "-- SQLite does not support altering column {}.{}; manual migration required",
            table, target.name
        )
    }

    fn drop_index(&self, _table: &str, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }

    fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "-- SQLite cannot add foreign key {} to {}; foreign keys must be defined when the table is created",
            fk.name, table
        )
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "-- SQLite does not support dropping foreign key {} from {}; manual migration required",
            fk.name, table
        )
    }
}
