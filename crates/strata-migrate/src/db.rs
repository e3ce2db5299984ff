//! Database connection handling.
//!
//! [`DbPool`] wraps one of the three sqlx pool types behind a single
//! surface, with the dialect inferred once from the connection URL
//! scheme. Everything downstream (introspection, history, the runner)
//! dispatches on the variant.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{MySqlPool, PgPool, SqlitePool};
use tracing::debug;

use strata_core::dialect::Dialect;

use crate::error::{MigrateError, Result};

/// Infers the dialect from a database URL scheme.
pub fn dialect_from_url(url: &str) -> Result<Dialect> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Dialect::Postgres)
    } else if url.starts_with("mysql://") {
        Ok(Dialect::MySql)
    } else if url.starts_with("sqlite:") || url == ":memory:" {
        Ok(Dialect::Sqlite)
    } else {
        Err(MigrateError::UnsupportedUrl(url.to_string()))
    }
}

/// A connection pool to one of the supported engines.
#[derive(Debug, Clone)]
pub enum DbPool {
    /// PostgreSQL pool.
    Postgres(PgPool),
    /// MySQL pool.
    MySql(MySqlPool),
    /// SQLite pool.
    Sqlite(SqlitePool),
}

impl DbPool {
    /// Connects to the database named by `url`, inferring the dialect
    /// from the URL scheme.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = match dialect_from_url(url)? {
            Dialect::Postgres => {
                let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
                Self::Postgres(pool)
            }
            Dialect::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(5)
                    .connect(url)
                    .await?;
                Self::MySql(pool)
            }
            Dialect::Sqlite => {
                // SQLite in-memory databases are per-connection.
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(url)
                    .await?;
                Self::Sqlite(pool)
            }
        };
        debug!(dialect = %pool.dialect(), "connected");
        Ok(pool)
    }

    /// The dialect of the connected engine.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Postgres(_) => Dialect::Postgres,
            Self::MySql(_) => Dialect::MySql,
            Self::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Executes a single statement.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            Self::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            Self::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            Self::Sqlite(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Executes a statement sequence inside one transaction. The first
    /// failing statement aborts and rolls back the whole batch.
    pub async fn execute_batch(&self, statements: &[String]) -> Result<()> {
        match self {
            Self::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                for sql in statements {
                    sqlx::query(sql).execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            Self::MySql(pool) => {
                let mut tx = pool.begin().await?;
                for sql in statements {
                    sqlx::query(sql).execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            Self::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                for sql in statements {
                    sqlx::query(sql).execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_inference_from_url() {
        assert_eq!(
            dialect_from_url("postgres://localhost/app").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            dialect_from_url("postgresql://localhost/app").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            dialect_from_url("mysql://localhost/app").unwrap(),
            Dialect::MySql
        );
        assert_eq!(dialect_from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert_eq!(dialect_from_url(":memory:").unwrap(), Dialect::Sqlite);
        assert!(matches!(
            dialect_from_url("mssql://localhost"),
            Err(MigrateError::UnsupportedUrl(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_execute_round_trip() {
        let pool = DbPool::connect("sqlite::memory:").await.unwrap();
        assert_eq!(pool.dialect(), Dialect::Sqlite);

        pool.execute("CREATE TABLE t (x INTEGER)").await.unwrap();
        pool.execute_batch(&[
            "INSERT INTO t (x) VALUES (1);".to_string(),
            "INSERT INTO t (x) VALUES (2);".to_string(),
        ])
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_batch_rolls_back() {
        let pool = DbPool::connect("sqlite::memory:").await.unwrap();
        pool.execute("CREATE TABLE t (x INTEGER)").await.unwrap();

        let result = pool
            .execute_batch(&[
                "INSERT INTO t (x) VALUES (1);".to_string(),
                "INSERT INTO nonexistent (x) VALUES (2);".to_string(),
            ])
            .await;
        assert!(result.is_err());

        // The first insert must have been rolled back with the batch.
        if let DbPool::Sqlite(pool) = &pool {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
                .fetch_one(pool)
                .await
                .unwrap();
            assert_eq!(count.0, 0);
        }
    }
}
