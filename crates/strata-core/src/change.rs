//! Typed schema changes.
//!
//! A diff is an ordered list of [`SchemaChange`] values. Destructive
//! variants retain the full definition of what they remove, so the SQL
//! generator can synthesize an exact inverse without re-deriving state
//! that no longer exists once the forward change has been applied.

use serde::{Deserialize, Serialize};

use crate::schema::{Column, ForeignKey, Index, TableSchema};

/// A change to a single column inside an [`SchemaChange::AlterTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TableChange {
    /// Add a new column.
    AddColumn {
        /// The column to add.
        column: Column,
    },
    /// Drop an existing column. The full definition is retained so the
    /// inverse can re-add it.
    DropColumn {
        /// The column being dropped.
        column: Column,
    },
    /// Change an existing column's definition. Both versions are retained
    /// so the inverse can restore the original.
    ModifyColumn {
        /// The definition currently in the database.
        current: Column,
        /// The definition the database should have.
        desired: Column,
    },
}

impl TableChange {
    /// The name of the column this change touches.
    #[must_use]
    pub fn column_name(&self) -> &str {
        match self {
            Self::AddColumn { column } | Self::DropColumn { column } => &column.name,
            Self::ModifyColumn { desired, .. } => &desired.name,
        }
    }
}

/// A single structural change between two database schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaChange {
    /// Create a table that exists only in the desired schema.
    CreateTable {
        /// The full desired table definition.
        table: TableSchema,
    },
    /// Drop a table that exists only in the current schema. The full
    /// definition is retained for inverse generation.
    DropTable {
        /// The full current table definition.
        table: TableSchema,
    },
    /// Column-level changes to a table present in both schemas.
    AlterTable {
        /// Owning table name.
        table: String,
        /// Column changes, adds and modifies first, then drops.
        changes: Vec<TableChange>,
    },
    /// Create an index.
    CreateIndex {
        /// Owning table name.
        table: String,
        /// The index to create.
        index: Index,
    },
    /// Drop an index. The definition is retained for inverse generation.
    DropIndex {
        /// Owning table name.
        table: String,
        /// The index being dropped.
        index: Index,
    },
    /// Add a foreign key constraint.
    AddForeignKey {
        /// Owning table name.
        table: String,
        /// The constraint to add.
        foreign_key: ForeignKey,
    },
    /// Drop a foreign key constraint. The definition is retained for
    /// inverse generation.
    DropForeignKey {
        /// Owning table name.
        table: String,
        /// The constraint being dropped.
        foreign_key: ForeignKey,
    },
}

impl SchemaChange {
    /// The name of the table this change belongs to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => &table.name,
            Self::AlterTable { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => table,
        }
    }

    /// A human-readable one-line description, for logs and dry runs.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("create table '{}'", table.name),
            Self::DropTable { table } => format!("drop table '{}'", table.name),
            Self::AlterTable { table, changes } => {
                format!("alter table '{}' ({} column changes)", table, changes.len())
            }
            Self::CreateIndex { table, index } => {
                format!("create index '{}' on '{}'", index.name, table)
            }
            Self::DropIndex { table, index } => {
                format!("drop index '{}' on '{}'", index.name, table)
            }
            Self::AddForeignKey { table, foreign_key } => {
                format!("add foreign key '{}' to '{}'", foreign_key.name, table)
            }
            Self::DropForeignKey { table, foreign_key } => {
                format!("drop foreign key '{}' from '{}'", foreign_key.name, table)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SemanticType;

    #[test]
    fn table_name_accessor() {
        let change = SchemaChange::CreateTable {
            table: TableSchema::new("users"),
        };
        assert_eq!(change.table_name(), "users");

        let change = SchemaChange::DropIndex {
            table: "posts".into(),
            index: Index::new("idx_posts_slug", vec!["slug".into()]),
        };
        assert_eq!(change.table_name(), "posts");
    }

    #[test]
    fn column_name_accessor() {
        let add = TableChange::AddColumn {
            column: Column::new("email", SemanticType::Varchar),
        };
        assert_eq!(add.column_name(), "email");

        let modify = TableChange::ModifyColumn {
            current: Column::new("age", SemanticType::Integer),
            desired: Column::new("age", SemanticType::BigInt),
        };
        assert_eq!(modify.column_name(), "age");
    }

    #[test]
    fn description_mentions_subject() {
        let change = SchemaChange::AddForeignKey {
            table: "posts".into(),
            foreign_key: ForeignKey::new("fk_posts_user_id", "user_id", "users", "id"),
        };
        assert!(change.description().contains("fk_posts_user_id"));
        assert!(change.description().contains("posts"));
    }
}
