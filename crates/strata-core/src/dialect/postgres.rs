//! PostgreSQL dialect.

use super::SqlDialect;
use crate::schema::{Column, Index, SemanticType};

/// PostgreSQL DDL renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn type_sql(&self, ty: &SemanticType) -> String {
        match ty {
            SemanticType::Integer => "INTEGER".to_string(),
            SemanticType::BigInt => "BIGINT".to_string(),
            SemanticType::Varchar => "VARCHAR(255)".to_string(),
            SemanticType::Text => "TEXT".to_string(),
            SemanticType::Boolean => "BOOLEAN".to_string(),
            SemanticType::Timestamp => "TIMESTAMP".to_string(),
            SemanticType::Json => "JSON".to_string(),
            SemanticType::Decimal => "DECIMAL".to_string(),
            SemanticType::Other(name) => name.to_uppercase(),
        }
    }

    fn column_definition(&self, col: &Column, single_pk: bool) -> String {
        // SERIAL replaces the declared type and carries the key itself.
        if col.auto_increment {
            return format!("{} SERIAL PRIMARY KEY", self.quote_identifier(&col.name));
        }
        self.generic_column_definition(col, single_pk)
    }

    fn modify_column(&self, table: &str, target: &Column) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            self.quote_identifier(table),
            self.quote_identifier(&target.name),
            self.type_sql(&target.ty)
        )
    }

    fn drop_index(&self, _table: &str, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }
}
