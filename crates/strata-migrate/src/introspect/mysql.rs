//! MySQL catalog introspection.

use std::collections::BTreeMap;

use sqlx::{MySqlPool, Row};
use tracing::debug;

use strata_core::schema::{
    Column, DatabaseSchema, ForeignKey, Index, ReferentialAction, SemanticType, TableSchema,
};

use crate::error::Result;

/// Reads schema structure from `information_schema`, scoped to the
/// connection's current database.
#[derive(Debug)]
pub struct MySqlIntrospector {
    pool: MySqlPool,
    migrations_table: String,
}

impl MySqlIntrospector {
    /// Creates an introspector over an open pool.
    #[must_use]
    pub fn new(pool: MySqlPool, migrations_table: String) -> Self {
        Self {
            pool,
            migrations_table,
        }
    }

    /// Reads the complete schema of the current database.
    pub async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new();

        let table_rows = sqlx::query(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
               AND TABLE_NAME <> ? \
             ORDER BY TABLE_NAME",
        )
        .bind(&self.migrations_table)
        .fetch_all(&self.pool)
        .await?;

        for row in table_rows {
            let table_name: String = row.get("TABLE_NAME");
            debug!(table = %table_name, "introspecting table");
            let table = self.introspect_table(&table_name).await?;
            schema.add_table(table);
        }

        Ok(schema)
    }

    async fn introspect_table(&self, table_name: &str) -> Result<TableSchema> {
        let mut table = TableSchema::new(table_name);

        let column_rows = sqlx::query(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT, COLUMN_KEY, EXTRA \
             FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        for row in column_rows {
            let name: String = row.get("COLUMN_NAME");
            let data_type: String = row.get("DATA_TYPE");
            let nullable: String = row.get("IS_NULLABLE");
            let default: Option<String> = row.try_get("COLUMN_DEFAULT").ok();
            let column_key: String = row.get("COLUMN_KEY");
            let extra: String = row.get("EXTRA");

            let primary_key = column_key == "PRI";
            if primary_key {
                table.primary_key.push(name.clone());
            }

            table.columns.push(Column {
                name,
                ty: normalize_type(&data_type),
                not_null: nullable == "NO",
                default,
                primary_key,
                auto_increment: extra.contains("auto_increment"),
            });
        }

        table.indexes = self.fetch_indexes(table_name).await?;
        table.foreign_keys = self.fetch_foreign_keys(table_name).await?;

        Ok(table)
    }

    async fn fetch_indexes(&self, table_name: &str) -> Result<Vec<Index>> {
        let rows = sqlx::query(
            "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE \
             FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
               AND INDEX_NAME <> 'PRIMARY' \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        let mut indexes: BTreeMap<String, Index> = BTreeMap::new();
        for row in rows {
            let name: String = row.get("INDEX_NAME");
            let column: String = row.get("COLUMN_NAME");
            let non_unique: i64 = row.get("NON_UNIQUE");
            indexes
                .entry(name.clone())
                .or_insert_with(|| Index {
                    name,
                    columns: Vec::new(),
                    unique: non_unique == 0,
                })
                .columns
                .push(column);
        }
        Ok(indexes.into_values().collect())
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            "SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME, \
                    kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME, \
                    rc.DELETE_RULE, rc.UPDATE_RULE \
             FROM information_schema.KEY_COLUMN_USAGE kcu \
             JOIN information_schema.REFERENTIAL_CONSTRAINTS rc \
               ON rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
              AND rc.CONSTRAINT_SCHEMA = kcu.TABLE_SCHEMA \
             WHERE kcu.TABLE_SCHEMA = DATABASE() AND kcu.TABLE_NAME = ? \
               AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
             ORDER BY kcu.CONSTRAINT_NAME",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let delete_rule: String = row.get("DELETE_RULE");
                let update_rule: String = row.get("UPDATE_RULE");
                ForeignKey {
                    name: row.get("CONSTRAINT_NAME"),
                    column: row.get("COLUMN_NAME"),
                    referenced_table: row.get("REFERENCED_TABLE_NAME"),
                    referenced_column: row.get("REFERENCED_COLUMN_NAME"),
                    on_delete: ReferentialAction::from_rule(&delete_rule),
                    on_update: ReferentialAction::from_rule(&update_rule),
                }
            })
            .collect())
    }
}

/// Maps a MySQL native type spelling to the semantic vocabulary.
/// Total: unmapped spellings pass through lowercased.
pub(crate) fn normalize_type(native: &str) -> SemanticType {
    match native.trim().to_lowercase().as_str() {
        "int" | "integer" => SemanticType::Integer,
        "bigint" => SemanticType::BigInt,
        "varchar" | "char" => SemanticType::Varchar,
        "text" | "tinytext" | "mediumtext" | "longtext" => SemanticType::Text,
        // MySQL's BOOLEAN is an alias for TINYINT(1).
        "tinyint" | "boolean" | "bool" => SemanticType::Boolean,
        "datetime" | "timestamp" => SemanticType::Timestamp,
        "json" => SemanticType::Json,
        "decimal" | "numeric" => SemanticType::Decimal,
        other => SemanticType::Other(other.to_string()),
    }
}
