//! PostgreSQL catalog introspection.

use std::collections::BTreeMap;

use sqlx::{PgPool, Row};
use tracing::debug;

use strata_core::schema::{
    Column, DatabaseSchema, ForeignKey, Index, ReferentialAction, SemanticType, TableSchema,
};

use crate::error::Result;

/// Reads schema structure from `information_schema` and the `pg_catalog`
/// index metadata.
#[derive(Debug)]
pub struct PostgresIntrospector {
    pool: PgPool,
    migrations_table: String,
}

impl PostgresIntrospector {
    /// Creates an introspector over an open pool.
    #[must_use]
    pub fn new(pool: PgPool, migrations_table: String) -> Self {
        Self {
            pool,
            migrations_table,
        }
    }

    /// Reads the complete schema of the `public` namespace.
    pub async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new();

        let table_rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
               AND table_name <> $1 \
             ORDER BY table_name",
        )
        .bind(&self.migrations_table)
        .fetch_all(&self.pool)
        .await?;

        for row in table_rows {
            let table_name: String = row.get("table_name");
            debug!(table = %table_name, "introspecting table");
            let table = self.introspect_table(&table_name).await?;
            schema.add_table(table);
        }

        Ok(schema)
    }

    async fn introspect_table(&self, table_name: &str) -> Result<TableSchema> {
        let mut table = TableSchema::new(table_name);

        let primary_key = self.fetch_primary_key(table_name).await?;

        let column_rows = sqlx::query(
            "SELECT column_name, data_type, is_nullable, column_default, is_identity \
             FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        for row in column_rows {
            let name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let nullable: String = row.get("is_nullable");
            let default: Option<String> = row.try_get("column_default").ok();
            let is_identity: String = row.get("is_identity");

            let auto_increment = is_identity == "YES"
                || default
                    .as_deref()
                    .is_some_and(|d| d.starts_with("nextval("));
            let primary_key_member = primary_key.contains(&name);

            table.columns.push(Column {
                name,
                ty: normalize_type(&data_type),
                not_null: nullable == "NO" || primary_key_member,
                // A serial's nextval() default is the auto-increment
                // mechanism, not a user-declared default.
                default: if auto_increment { None } else { default },
                primary_key: primary_key_member,
                auto_increment,
            });
        }

        table.primary_key = primary_key;
        table.indexes = self.fetch_indexes(table_name).await?;
        table.foreign_keys = self.fetch_foreign_keys(table_name).await?;

        Ok(table)
    }

    async fn fetch_primary_key(&self, table_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_name = kcu.table_name \
             WHERE tc.table_schema = 'public' AND tc.table_name = $1 \
               AND tc.constraint_type = 'PRIMARY KEY' \
             ORDER BY kcu.ordinal_position",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get("column_name"))
            .collect())
    }

    async fn fetch_indexes(&self, table_name: &str) -> Result<Vec<Index>> {
        // pg_index rather than information_schema: it is the only catalog
        // that exposes index column order reliably.
        let rows = sqlx::query(
            "SELECT i.relname AS index_name, ix.indisunique AS is_unique, a.attname AS column_name \
             FROM pg_class t \
             JOIN pg_index ix ON t.oid = ix.indrelid \
             JOIN pg_class i ON i.oid = ix.indexrelid \
             JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS ord(attnum, ordinality) ON true \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ord.attnum \
             WHERE t.relname = $1 AND NOT ix.indisprimary \
             ORDER BY index_name, ord.ordinality",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        let mut indexes: BTreeMap<String, Index> = BTreeMap::new();
        for row in rows {
            let name: String = row.get("index_name");
            let unique: bool = row.get("is_unique");
            let column: String = row.get("column_name");
            indexes
                .entry(name.clone())
                .or_insert_with(|| Index {
                    name,
                    columns: Vec::new(),
                    unique,
                })
                .columns
                .push(column);
        }
        Ok(indexes.into_values().collect())
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            "SELECT tc.constraint_name, kcu.column_name, \
                    ccu.table_name AS referenced_table, \
                    ccu.column_name AS referenced_column, \
                    rc.delete_rule, rc.update_rule \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_name = kcu.table_name \
             JOIN information_schema.constraint_column_usage ccu \
               ON ccu.constraint_name = tc.constraint_name \
             JOIN information_schema.referential_constraints rc \
               ON rc.constraint_name = tc.constraint_name \
             WHERE tc.table_schema = 'public' AND tc.table_name = $1 \
               AND tc.constraint_type = 'FOREIGN KEY' \
             ORDER BY tc.constraint_name",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let delete_rule: String = row.get("delete_rule");
                let update_rule: String = row.get("update_rule");
                ForeignKey {
                    name: row.get("constraint_name"),
                    column: row.get("column_name"),
                    referenced_table: row.get("referenced_table"),
                    referenced_column: row.get("referenced_column"),
                    on_delete: ReferentialAction::from_rule(&delete_rule),
                    on_update: ReferentialAction::from_rule(&update_rule),
                }
            })
            .collect())
    }
}

/// Maps a Postgres native type spelling to the semantic vocabulary.
/// Total: unmapped spellings pass through lowercased.
pub(crate) fn normalize_type(native: &str) -> SemanticType {
    match native.trim().to_lowercase().as_str() {
        "integer" | "int" | "int4" => SemanticType::Integer,
        "bigint" | "int8" => SemanticType::BigInt,
        "character varying" | "varchar" => SemanticType::Varchar,
        "text" => SemanticType::Text,
        "boolean" | "bool" => SemanticType::Boolean,
        "timestamp" | "timestamp without time zone" | "timestamp with time zone" => {
            SemanticType::Timestamp
        }
        "json" | "jsonb" => SemanticType::Json,
        "numeric" | "decimal" => SemanticType::Decimal,
        other => SemanticType::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_types_normalize() {
        assert_eq!(normalize_type("integer"), SemanticType::Integer);
        assert_eq!(normalize_type("character varying"), SemanticType::Varchar);
        assert_eq!(
            normalize_type("timestamp without time zone"),
            SemanticType::Timestamp
        );
        assert_eq!(normalize_type("jsonb"), SemanticType::Json);
        assert_eq!(normalize_type("numeric"), SemanticType::Decimal);
    }

    #[test]
    fn unmapped_types_pass_through_lowercased() {
        assert_eq!(
            normalize_type("TSVECTOR"),
            SemanticType::Other("tsvector".into())
        );
        assert_eq!(
            normalize_type("double precision"),
            SemanticType::Other("double precision".into())
        );
    }
}
