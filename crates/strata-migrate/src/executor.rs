//! Migration execution.
//!
//! Applies and rolls back migration files against a live database. Each
//! migration's statements run inside a single transaction; success is
//! recorded in the history table, rollback removes the record.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::error::{MigrateError, Result};
use crate::history::MigrationHistory;

/// A migration loaded from a `.up.sql` / `.down.sql` file pair.
///
/// Statements within a file are separated by blank lines, the format the
/// writer produces. This is deliberately not a SQL parser.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFile {
    /// Migration name: the file stem without the `.up.sql` suffix.
    pub name: String,
    /// Forward statements in execution order.
    pub up_statements: Vec<String>,
    /// Inverse statements in execution order.
    pub down_statements: Vec<String>,
}

impl MigrationFile {
    /// Builds a migration from raw file text.
    #[must_use]
    pub fn from_text(name: impl Into<String>, up: &str, down: &str) -> Self {
        Self {
            name: name.into(),
            up_statements: split_statements(up),
            down_statements: split_statements(down),
        }
    }

    /// Whether this migration has any reverse statements.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        !self.down_statements.is_empty()
    }
}

/// Splits migration file text into statements on blank-line boundaries.
fn split_statements(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Discovers migration file pairs in a directory, sorted by name.
///
/// A missing `.down.sql` file yields an irreversible migration rather
/// than an error; the validator reports it.
pub fn discover_migrations(dir: &Path) -> Result<Vec<MigrationFile>> {
    if !dir.is_dir() {
        return Err(MigrateError::MigrationsDirNotFound(dir.to_path_buf()));
    }

    let mut migrations = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(name) = file_name.strip_suffix(".up.sql") else {
            continue;
        };

        let up = fs::read_to_string(&path)?;
        let down_path = dir.join(format!("{name}.down.sql"));
        let down = if down_path.is_file() {
            fs::read_to_string(&down_path)?
        } else {
            String::new()
        };

        migrations.push(MigrationFile::from_text(name, &up, &down));
    }

    migrations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(migrations)
}

/// Applies and rolls back migrations against a database.
pub struct MigrationRunner {
    pool: DbPool,
    history: MigrationHistory,
    dry_run: bool,
}

impl MigrationRunner {
    /// Creates a runner over an open pool, tracking history in
    /// `migrations_table`.
    #[must_use]
    pub fn new(pool: DbPool, migrations_table: impl Into<String>) -> Self {
        let history = MigrationHistory::new(pool.clone(), migrations_table);
        Self {
            pool,
            history,
            dry_run: false,
        }
    }

    /// Enables dry-run mode: SQL is printed but not executed.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Ensures the history table exists.
    pub async fn init(&self) -> Result<()> {
        if !self.dry_run {
            self.history.ensure_table().await?;
        }
        Ok(())
    }

    /// The migration history.
    #[must_use]
    pub fn history(&self) -> &MigrationHistory {
        &self.history
    }

    /// Applies one migration inside a transaction and records it.
    /// Already-applied migrations are skipped.
    pub async fn apply(&self, migration: &MigrationFile) -> Result<()> {
        if !self.dry_run && self.history.is_applied(&migration.name).await? {
            warn!(name = %migration.name, "migration already applied, skipping");
            return Ok(());
        }

        info!(name = %migration.name, "applying migration");
        self.execute_statements(&migration.up_statements).await?;

        if !self.dry_run {
            self.history.record_applied(&migration.name).await?;
        }
        Ok(())
    }

    /// Rolls back one migration and removes its history record.
    /// Not-yet-applied migrations are skipped.
    pub async fn revert(&self, migration: &MigrationFile) -> Result<()> {
        if !self.dry_run && !self.history.is_applied(&migration.name).await? {
            warn!(name = %migration.name, "migration not applied, skipping rollback");
            return Ok(());
        }
        if !migration.is_reversible() {
            return Err(MigrateError::InvalidMigration {
                name: migration.name.clone(),
                message: "no down migration".to_string(),
            });
        }

        info!(name = %migration.name, "rolling back migration");
        self.execute_statements(&migration.down_statements).await?;

        if !self.dry_run {
            self.history.record_unapplied(&migration.name).await?;
        }
        Ok(())
    }

    /// Applies migrations in order.
    pub async fn apply_all(&self, migrations: &[MigrationFile]) -> Result<()> {
        for migration in migrations {
            self.apply(migration).await?;
        }
        Ok(())
    }

    /// Rolls back migrations in reverse order.
    pub async fn revert_all(&self, migrations: &[MigrationFile]) -> Result<()> {
        for migration in migrations.iter().rev() {
            self.revert(migration).await?;
        }
        Ok(())
    }

    /// Migrations not yet recorded as applied, in order.
    pub async fn pending<'a>(
        &self,
        migrations: &'a [MigrationFile],
    ) -> Result<Vec<&'a MigrationFile>> {
        let mut pending = Vec::new();
        for migration in migrations {
            if !self.history.is_applied(&migration.name).await? {
                pending.push(migration);
            }
        }
        Ok(pending)
    }

    /// Runs one statement sequence in a single transaction, skipping
    /// comment statements (dialect capability gaps).
    async fn execute_statements(&self, statements: &[String]) -> Result<()> {
        let mut executable = Vec::new();
        for sql in statements {
            if sql.starts_with("--") {
                warn!(comment = %sql, "skipping comment (unsupported operation)");
                continue;
            }
            debug!(sql = %sql, "queueing statement");
            executable.push(sql.clone());
        }

        if self.dry_run {
            for sql in &executable {
                println!("{sql}");
            }
            return Ok(());
        }

        if !executable.is_empty() {
            self.pool.execute_batch(&executable).await?;
        }
        Ok(())
    }
}
