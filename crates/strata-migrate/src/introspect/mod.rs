//! Live-database schema introspection.
//!
//! One implementation per dialect, each reading its engine's catalog
//! tables or pragmas and producing a normalized
//! [`DatabaseSchema`](strata_core::schema::DatabaseSchema). The three
//! share nothing but the output shape: Postgres and MySQL walk
//! `information_schema` (plus `pg_index` for index column order), SQLite
//! walks `sqlite_master` and pragmas.
//!
//! Introspection is all-or-nothing per call: any catalog query failure
//! propagates unchanged, and no partial schema is ever returned. The
//! configured migrations bookkeeping table is excluded from the result.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlIntrospector;
pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

use strata_core::dialect::Dialect;
use strata_core::schema::DatabaseSchema;

use crate::db::DbPool;
use crate::error::Result;

/// Reads a live database's structure into the normalized schema model.
///
/// The dialect variant is fixed at construction from the connection's
/// pool type.
#[derive(Debug)]
pub enum Introspector {
    /// PostgreSQL catalog reader.
    Postgres(PostgresIntrospector),
    /// MySQL catalog reader.
    MySql(MySqlIntrospector),
    /// SQLite pragma reader.
    Sqlite(SqliteIntrospector),
}

impl Introspector {
    /// Wraps a connected pool, excluding `migrations_table` from
    /// introspection results.
    #[must_use]
    pub fn new(pool: DbPool, migrations_table: impl Into<String>) -> Self {
        let migrations_table = migrations_table.into();
        match pool {
            DbPool::Postgres(pool) => {
                Self::Postgres(PostgresIntrospector::new(pool, migrations_table))
            }
            DbPool::MySql(pool) => Self::MySql(MySqlIntrospector::new(pool, migrations_table)),
            DbPool::Sqlite(pool) => Self::Sqlite(SqliteIntrospector::new(pool, migrations_table)),
        }
    }

    /// Connects to `url` and wraps the resulting pool.
    pub async fn connect(url: &str, migrations_table: impl Into<String>) -> Result<Self> {
        Ok(Self::new(DbPool::connect(url).await?, migrations_table))
    }

    /// The dialect this introspector reads.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Postgres(_) => Dialect::Postgres,
            Self::MySql(_) => Dialect::MySql,
            Self::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Reads the complete current schema. An empty database yields an
    /// empty schema, never an error.
    pub async fn introspect(&self) -> Result<DatabaseSchema> {
        match self {
            Self::Postgres(i) => i.introspect().await,
            Self::MySql(i) => i.introspect().await,
            Self::Sqlite(i) => i.introspect().await,
        }
    }
}
