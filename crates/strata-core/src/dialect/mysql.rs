//! MySQL dialect.

use super::SqlDialect;
use crate::schema::{Column, Index, SemanticType};

/// MySQL DDL renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn type_sql(&self, ty: &SemanticType) -> String {
        match ty {
            SemanticType::Integer => "INT".to_string(),
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

    fn auto_increment_clause(&self) -> &'static str {
        " AUTO_INCREMENT PRIMARY KEY"
    }

    fn column_definition(&self, col: &Column, single_pk: bool) -> String {
        self.generic_column_definition(col, single_pk)
    }

    fn modify_column(&self, table: &str, target: &Column) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(target, false)
        )
    }

    fn drop_index(&self, table: &str, index: &Index) -> String {
        // MySQL scopes index names to their table.
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&index.name),
            self.quote_identifier(table)
        )
    }
}
