//! Migration history tracking.
//!
//! Manages the bookkeeping table (default `strata_migrations`) that
//! records which migrations have been applied. The table name is
//! configurable and is excluded from introspection by the same name.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::DbPool;
use crate::error::{MigrateError, Result};

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    /// Migration name (file stem without the `.up.sql` suffix).
    pub name: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

/// Manages the migration bookkeeping table.
#[derive(Debug, Clone)]
pub struct MigrationHistory {
    pool: DbPool,
    table: String,
}

impl MigrationHistory {
    /// Creates a history manager over an open pool.
    #[must_use]
    pub fn new(pool: DbPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// The bookkeeping table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Ensures the bookkeeping table exists.
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = match self.pool {
            DbPool::Postgres(_) => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id SERIAL PRIMARY KEY, \
                 name VARCHAR(255) NOT NULL UNIQUE, \
                 applied_at VARCHAR(64) NOT NULL)",
                self.table
            ),
            DbPool::MySql(_) => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id INT AUTO_INCREMENT PRIMARY KEY, \
                 name VARCHAR(255) NOT NULL UNIQUE, \
                 applied_at VARCHAR(64) NOT NULL)",
                self.table
            ),
            DbPool::Sqlite(_) => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 name TEXT NOT NULL UNIQUE, \
                 applied_at TEXT NOT NULL)",
                self.table
            ),
        };
        self.pool.execute(&sql).await
    }

    /// Records a migration as applied, stamped with the current time.
    pub async fn record_applied(&self, name: &str) -> Result<()> {
        let applied_at = Utc::now().to_rfc3339();
        debug!(name, "recording migration as applied");
        match &self.pool {
            DbPool::Postgres(pool) => {
                let sql = format!(
                    "INSERT INTO {} (name, applied_at) VALUES ($1, $2)",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(name)
                    .bind(&applied_at)
                    .execute(pool)
                    .await?;
            }
            DbPool::MySql(pool) => {
                let sql = format!(
                    "INSERT INTO {} (name, applied_at) VALUES (?, ?)",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(name)
                    .bind(&applied_at)
                    .execute(pool)
                    .await?;
            }
            DbPool::Sqlite(pool) => {
                let sql = format!(
                    "INSERT INTO {} (name, applied_at) VALUES (?, ?)",
                    self.table
                );
                sqlx::query(&sql)
                    .bind(name)
                    .bind(&applied_at)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Removes a migration record after a rollback.
    pub async fn record_unapplied(&self, name: &str) -> Result<()> {
        let affected = match &self.pool {
            DbPool::Postgres(pool) => {
                let sql = format!("DELETE FROM {} WHERE name = $1", self.table);
                sqlx::query(&sql).bind(name).execute(pool).await?.rows_affected()
            }
            DbPool::MySql(pool) => {
                let sql = format!("DELETE FROM {} WHERE name = ?", self.table);
                sqlx::query(&sql).bind(name).execute(pool).await?.rows_affected()
            }
            DbPool::Sqlite(pool) => {
                let sql = format!("DELETE FROM {} WHERE name = ?", self.table);
                sqlx::query(&sql).bind(name).execute(pool).await?.rows_affected()
            }
        };

        if affected == 0 {
            return Err(MigrateError::MigrationNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Checks whether a migration has been applied.
    pub async fn is_applied(&self, name: &str) -> Result<bool> {
        let found = match &self.pool {
            DbPool::Postgres(pool) => {
                let sql = format!("SELECT 1 FROM {} WHERE name = $1", self.table);
                sqlx::query(&sql).bind(name).fetch_optional(pool).await?.is_some()
            }
            DbPool::MySql(pool) => {
                let sql = format!("SELECT 1 FROM {} WHERE name = ?", self.table);
                sqlx::query(&sql).bind(name).fetch_optional(pool).await?.is_some()
            }
            DbPool::Sqlite(pool) => {
                let sql = format!("SELECT 1 FROM {} WHERE name = ?", self.table);
                sqlx::query(&sql).bind(name).fetch_optional(pool).await?.is_some()
            }
        };
        Ok(found)
    }

    /// All applied migrations in application order.
    pub async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        let sql = format!("SELECT name, applied_at FROM {} ORDER BY id", self.table);
        let rows: Vec<(String, String)> = match &self.pool {
            DbPool::Postgres(pool) => sqlx::query_as(&sql).fetch_all(pool).await?,
            DbPool::MySql(pool) => sqlx::query_as(&sql).fetch_all(pool).await?,
            DbPool::Sqlite(pool) => sqlx::query_as(&sql).fetch_all(pool).await?,
        };

        Ok(rows
            .into_iter()
            .map(|(name, stamp)| AppliedMigration {
                name,
                applied_at: DateTime::parse_from_rfc3339(&stamp)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_history() -> MigrationHistory {
        let pool = DbPool::connect("sqlite::memory:").await.unwrap();
        let history = MigrationHistory::new(pool, "strata_migrations");
        history.ensure_table().await.unwrap();
        history
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let history = memory_history().await;
        history.ensure_table().await.unwrap();
        history.ensure_table().await.unwrap();
    }

    #[tokio::test]
    async fn record_and_query_applied() {
        let history = memory_history().await;

        assert!(!history.is_applied("0001_initial").await.unwrap());
        history.record_applied("0001_initial").await.unwrap();
        assert!(history.is_applied("0001_initial").await.unwrap());
    }

    #[tokio::test]
    async fn applied_preserves_order() {
        let history = memory_history().await;
        history.record_applied("0001_initial").await.unwrap();
        history.record_applied("0002_add_email").await.unwrap();

        let applied = history.applied().await.unwrap();
        let names: Vec<&str> = applied.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["0001_initial", "0002_add_email"]);
    }

    #[tokio::test]
    async fn unapply_removes_record() {
        let history = memory_history().await;
        history.record_applied("0001_initial").await.unwrap();
        history.record_unapplied("0001_initial").await.unwrap();
        assert!(!history.is_applied("0001_initial").await.unwrap());
    }

    #[tokio::test]
    async fn unapply_unknown_migration_fails() {
        let history = memory_history().await;
        let result = history.record_unapplied("0099_ghost").await;
        assert!(matches!(result, Err(MigrateError::MigrationNotFound(_))));
    }
}
