//! SQLite pragma introspection.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use strata_core::schema::{
    Column, DatabaseSchema, ForeignKey, Index, ReferentialAction, SemanticType, TableSchema,
};

use crate::error::Result;

/// Reads schema structure from `sqlite_master` and the `table_info`,
/// `index_list`, `index_info`, and `foreign_key_list` pragmas.
#[derive(Debug)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
    migrations_table: String,
}

impl SqliteIntrospector {
    /// Creates an introspector over an open pool.
    #[must_use]
    pub fn new(pool: SqlitePool, migrations_table: String) -> Self {
        Self {
            pool,
            migrations_table,
        }
    }

    /// Reads the complete schema, excluding SQLite internals and the
    /// migrations bookkeeping table.
    pub async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new();

        let table_rows = sqlx::query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> ? \
             ORDER BY name",
        )
        .bind(&self.migrations_table)
        .fetch_all(&self.pool)
        .await?;

        for row in table_rows {
            let table_name: String = row.get("name");
            let create_sql: Option<String> = row.try_get("sql").ok();
            debug!(table = %table_name, "introspecting table");
            let table = self
                .introspect_table(&table_name, create_sql.as_deref().unwrap_or(""))
                .await?;
            schema.add_table(table);
        }

        Ok(schema)
    }

    async fn introspect_table(&self, table_name: &str, create_sql: &str) -> Result<TableSchema> {
        let mut table = TableSchema::new(table_name);

        let column_rows = sqlx::query(&format!("PRAGMA table_info(\"{table_name}\")"))
            .fetch_all(&self.pool)
            .await?;

        // pk is the 1-based position of the column within the primary
        // key, or 0 for non-key columns.
        let mut pk_columns: Vec<(i64, String)> = Vec::new();
        let has_autoincrement = create_sql.to_uppercase().contains("AUTOINCREMENT");

        for row in column_rows {
            let name: String = row.get("name");
            let declared_type: String = row.get("type");
            let notnull: i64 = row.get("notnull");
            let default: Option<String> = row.try_get("dflt_value").ok();
            let pk_ordinal: i64 = row.get("pk");

            let primary_key = pk_ordinal > 0;
            if primary_key {
                pk_columns.push((pk_ordinal, name.clone()));
            }

            table.columns.push(Column {
                name,
                ty: normalize_type(&declared_type),
                not_null: notnull != 0 || primary_key,
                default,
                primary_key,
                auto_increment: primary_key && pk_ordinal == 1 && has_autoincrement,
            });
        }

        pk_columns.sort_by_key(|(ordinal, _)| *ordinal);
        table.primary_key = pk_columns.into_iter().map(|(_, name)| name).collect();

        table.indexes = self.fetch_indexes(table_name).await?;
        table.foreign_keys = self.fetch_foreign_keys(table_name).await?;

        Ok(table)
    }

    async fn fetch_indexes(&self, table_name: &str) -> Result<Vec<Index>> {
        let index_rows = sqlx::query(&format!("PRAGMA index_list(\"{table_name}\")"))
            .fetch_all(&self.pool)
            .await?;

        let mut indexes = Vec::new();
        for row in index_rows {
            let name: String = row.get("name");
            let unique: i64 = row.get("unique");
            let origin: Option<String> = row.try_get("origin").ok();

            // Skip primary-key backing indexes and the anonymous indexes
            // SQLite creates for inline UNIQUE constraints.
            if origin.as_deref() == Some("pk") || name.starts_with("sqlite_autoindex") {
                continue;
            }

            let info_rows = sqlx::query(&format!("PRAGMA index_info(\"{name}\")"))
                .fetch_all(&self.pool)
                .await?;
            let columns: Vec<String> = info_rows
                .into_iter()
                .map(|info| info.get("name"))
                .collect();

            indexes.push(Index {
                name,
                columns,
                unique: unique != 0,
            });
        }
        Ok(indexes)
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let fk_rows = sqlx::query(&format!("PRAGMA foreign_key_list(\"{table_name}\")"))
            .fetch_all(&self.pool)
            .await?;

        Ok(fk_rows
            .into_iter()
            .map(|row| {
                let column: String = row.get("from");
                let on_delete: String = row.get("on_delete");
                let on_update: String = row.get("on_update");
                ForeignKey {
                    // SQLite foreign keys are unnamed in the pragma;
                    // synthesize a stable name from table and column.
                    name: format!("fk_{table_name}_{column}"),
                    column,
                    referenced_table: row.get("table"),
                    referenced_column: row.get("to"),
                    on_delete: ReferentialAction::from_rule(&on_delete),
                    on_update: ReferentialAction::from_rule(&on_update),
                }
            })
            .collect())
    }
}

/// Maps a SQLite declared type to the semantic vocabulary. Declared types
/// may carry a length suffix (`VARCHAR(255)`), which is stripped before
/// matching. Total: unmapped spellings pass through lowercased.
pub(crate) fn normalize_type(declared: &str) -> SemanticType {
    let base = declared
        .split('(')
        .next()
        .unwrap_or(declared)
        .trim()
        .to_lowercase();
    match base.as_str() {
        "integer" | "int" => SemanticType::Integer,
        "bigint" => SemanticType::BigInt,
        "varchar" | "character varying" => SemanticType::Varchar,
        "text" | "clob" => SemanticType::Text,
        "boolean" | "bool" => SemanticType::Boolean,
        "timestamp" | "datetime" => SemanticType::Timestamp,
        "json" => SemanticType::Json,
        "real" | "double" | "float" | "numeric" | "decimal" => SemanticType::Decimal,
        other => SemanticType::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use crate::introspect::Introspector;

    const MIGRATIONS_TABLE: &str = "strata_migrations";

    async fn seeded_pool() -> DbPool {
        let pool = DbPool::connect("sqlite::memory:").await.unwrap();
        for sql in [
            "CREATE TABLE users (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 email TEXT NOT NULL, \
                 bio TEXT DEFAULT 'none')",
            "CREATE TABLE posts (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE, \
                 title VARCHAR(255))",
            "CREATE UNIQUE INDEX idx_users_email ON users(email)",
            "CREATE INDEX idx_posts_title ON posts(title)",
            "CREATE TABLE strata_migrations (id INTEGER PRIMARY KEY, name TEXT)",
        ] {
            pool.execute(sql).await.unwrap();
        }
        pool
    }

    #[test]
    fn declared_types_normalize() {
        assert_eq!(normalize_type("INTEGER"), SemanticType::Integer);
        assert_eq!(normalize_type("VARCHAR(255)"), SemanticType::Varchar);
        assert_eq!(normalize_type("datetime"), SemanticType::Timestamp);
        assert_eq!(normalize_type("REAL"), SemanticType::Decimal);
        assert_eq!(normalize_type("BLOB"), SemanticType::Other("blob".into()));
    }

    #[tokio::test]
    async fn empty_database_yields_empty_schema() {
        let pool = DbPool::connect("sqlite::memory:").await.unwrap();
        let introspector = Introspector::new(pool, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();
        assert!(schema.is_empty());
    }

    #[tokio::test]
    async fn migrations_table_is_excluded() {
        let introspector = Introspector::new(seeded_pool().await, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();

        assert!(schema.table_named("strata_migrations").is_none());
        assert_eq!(schema.tables.len(), 2);
    }

    #[tokio::test]
    async fn columns_and_primary_key_read_back() {
        let introspector = Introspector::new(seeded_pool().await, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();

        let users = schema.table_named("users").unwrap();
        assert_eq!(users.primary_key, vec!["id"]);

        let id = users.column_named("id").unwrap();
        assert!(id.primary_key);
        assert!(id.auto_increment);
        assert!(id.not_null);
        assert_eq!(id.ty, SemanticType::Integer);

        let email = users.column_named("email").unwrap();
        assert!(email.not_null);
        assert!(!email.primary_key);
        assert_eq!(email.ty, SemanticType::Text);

        let bio = users.column_named("bio").unwrap();
        assert!(!bio.not_null);
        assert_eq!(bio.default.as_deref(), Some("'none'"));
    }

    #[tokio::test]
    async fn indexes_read_back_with_uniqueness() {
        let introspector = Introspector::new(seeded_pool().await, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();

        let users = schema.table_named("users").unwrap();
        let email_idx = users.index_named("idx_users_email").unwrap();
        assert!(email_idx.unique);
        assert_eq!(email_idx.columns, vec!["email"]);

        let posts = schema.table_named("posts").unwrap();
        let title_idx = posts.index_named("idx_posts_title").unwrap();
        assert!(!title_idx.unique);
    }

    #[tokio::test]
    async fn foreign_keys_read_back_with_actions() {
        let introspector = Introspector::new(seeded_pool().await, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();

        let posts = schema.table_named("posts").unwrap();
        assert_eq!(posts.foreign_keys.len(), 1);

        let fk = &posts.foreign_keys[0];
        assert_eq!(fk.name, "fk_posts_user_id");
        assert_eq!(fk.column, "user_id");
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.referenced_column, "id");
        assert_eq!(fk.on_delete, Some(ReferentialAction::Cascade));
        assert_eq!(fk.on_update, None);
    }

    #[tokio::test]
    async fn introspected_schema_diffs_clean_against_itself() {
        let introspector = Introspector::new(seeded_pool().await, MIGRATIONS_TABLE);
        let schema = introspector.introspect().await.unwrap();
        assert!(strata_core::diff::diff(&schema, &schema).is_empty());
    }
}
