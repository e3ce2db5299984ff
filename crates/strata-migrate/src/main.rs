//! strata-migrate CLI
//!
//! Command-line tool for diffing schemas and managing migrations.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use strata_core::prelude::*;
use strata_migrate::prelude::*;
use strata_migrate::DEFAULT_MIGRATIONS_TABLE;

/// Schema diffing and migrations for PostgreSQL, MySQL, and SQLite.
#[derive(Parser)]
#[command(name = "strata-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (postgres://, mysql://, or sqlite:).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Migrations directory.
    #[arg(short, long, default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Name of the migration bookkeeping table.
    #[arg(long, default_value = DEFAULT_MIGRATIONS_TABLE)]
    migrations_table: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the migrations system (create the bookkeeping table).
    Init,

    /// Diff the live database against a declared schema and print SQL.
    Diff {
        /// Declarative schema file (JSON).
        #[arg(short, long)]
        schema: PathBuf,

        /// Print the down statements instead of the up statements.
        #[arg(long)]
        down: bool,
    },

    /// Diff and write the result as a migration file pair.
    MakeMigration {
        /// Declarative schema file (JSON).
        #[arg(short, long)]
        schema: PathBuf,

        /// Migration name.
        #[arg(short, long)]
        name: String,

        /// Print the SQL without writing files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply pending migrations.
    Migrate {
        /// Roll back instead of applying.
        #[arg(short, long)]
        revert: bool,

        /// Number of migrations to apply or roll back (all if omitted).
        #[arg(short, long)]
        count: Option<usize>,

        /// Print SQL without executing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show applied and pending migrations.
    Status,

    /// Lint migration files.
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init => {
            let pool = DbPool::connect(&cli.database).await?;
            let runner = MigrationRunner::new(pool, &cli.migrations_table);
            runner.init().await?;
            info!("migrations table created");
        }

        Commands::Diff { schema, down } => {
            let sql = diff_against(&cli.database, &cli.migrations_table, &schema).await?;
            if sql.is_empty() {
                info!("no changes detected");
            } else {
                let statements = if down {
                    &sql.down_statements
                } else {
                    &sql.up_statements
                };
                for statement in statements {
                    println!("{statement}");
                }
            }
        }

        Commands::MakeMigration {
            schema,
            name,
            dry_run,
        } => {
            let sql = diff_against(&cli.database, &cli.migrations_table, &schema).await?;
            if sql.is_empty() {
                info!("no changes detected, nothing to write");
            } else if dry_run {
                println!("-- up");
                for statement in &sql.up_statements {
                    println!("{statement}");
                }
                println!("-- down");
                for statement in &sql.down_statements {
                    println!("{statement}");
                }
            } else {
                let writer = MigrationWriter::new(&cli.migrations_dir);
                let (up_path, _) = writer.write(&name, &sql)?;
                info!(path = %up_path.display(), "migration written");
            }
        }

        Commands::Migrate {
            revert,
            count,
            dry_run,
        } => {
            let pool = DbPool::connect(&cli.database).await?;
            let runner = MigrationRunner::new(pool, &cli.migrations_table).dry_run(dry_run);
            runner.init().await?;

            let migrations = discover_migrations(&cli.migrations_dir)?;
            if revert {
                let applied: Vec<MigrationFile> = {
                    let mut applied = Vec::new();
                    for migration in &migrations {
                        if runner.history().is_applied(&migration.name).await? {
                            applied.push(migration.clone());
                        }
                    }
                    applied
                };
                let take = count.unwrap_or(1).min(applied.len());
                let targets = &applied[applied.len() - take..];
                runner.revert_all(targets).await?;
            } else {
                let pending: Vec<MigrationFile> = runner
                    .pending(&migrations)
                    .await?
                    .into_iter()
                    .cloned()
                    .collect();
                let take = count.unwrap_or(pending.len()).min(pending.len());
                runner.apply_all(&pending[..take]).await?;
            }
        }

        Commands::Status => {
            let pool = DbPool::connect(&cli.database).await?;
            let runner = MigrationRunner::new(pool, &cli.migrations_table);
            runner.init().await?;

            let applied = runner.history().applied().await?;
            if applied.is_empty() {
                info!("no migrations applied yet");
            } else {
                println!("\nApplied migrations:");
                println!("{:-<60}", "");
                for migration in &applied {
                    println!(
                        " [X] {} ({})",
                        migration.name,
                        migration.applied_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }

            if cli.migrations_dir.is_dir() {
                let migrations = discover_migrations(&cli.migrations_dir)?;
                let pending = runner.pending(&migrations).await?;
                if !pending.is_empty() {
                    println!("\nPending migrations:");
                    println!("{:-<60}", "");
                    for migration in pending {
                        println!(" [ ] {}", migration.name);
                    }
                }
            }
            println!();
        }

        Commands::Validate => {
            let issues = validate_dir(&cli.migrations_dir)?;
            if issues.is_empty() {
                info!("all migrations look good");
            } else {
                for issue in &issues {
                    match issue.severity {
                        Severity::Error => {
                            warn!(migration = %issue.migration, "ERROR: {}", issue.message);
                        }
                        Severity::Warning => {
                            warn!(migration = %issue.migration, "warning: {}", issue.message);
                        }
                    }
                }
                if issues.iter().any(|i| i.severity == Severity::Error) {
                    anyhow::bail!("validation failed");
                }
            }
        }
    }

    Ok(())
}

/// Introspects the live database and diffs it against a declared schema,
/// rendering SQL for the connection's dialect.
async fn diff_against(
    database: &str,
    migrations_table: &str,
    schema_path: &Path,
) -> anyhow::Result<MigrationSql> {
    let desired = load_schema(schema_path)?;

    let introspector = Introspector::connect(database, migrations_table).await?;
    let current = introspector.introspect().await?;

    let changes = diff(&current, &desired);
    for change in &changes {
        info!("{}", change.description());
    }

    let generator = SqlGenerator::new(introspector.dialect());
    Ok(generator.generate(&changes))
}
