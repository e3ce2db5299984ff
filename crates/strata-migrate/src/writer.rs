//! Migration file generation.
//!
//! Renders a generated up/down pair into a numbered
//! `NNNN_<slug>.up.sql` / `NNNN_<slug>.down.sql` file pair. Statements
//! are separated by blank lines, the format the executor splits on.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use strata_core::dialect::MigrationSql;

use crate::error::{MigrateError, Result};

/// Writes migration file pairs into a directory.
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    /// Creates a writer targeting `dir`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the up/down pair under the next free sequence number and
    /// returns the two paths created.
    pub fn write(&self, name: &str, sql: &MigrationSql) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.dir)?;

        let sequence = next_sequence(&self.dir)?;
        let stem = format!("{:04}_{}", sequence, slugify(name));

        let up_path = self.dir.join(format!("{stem}.up.sql"));
        let down_path = self.dir.join(format!("{stem}.down.sql"));
        if up_path.exists() {
            return Err(MigrateError::MigrationExists(up_path));
        }

        fs::write(&up_path, render_statements(&sql.up_statements))?;
        fs::write(&down_path, render_statements(&sql.down_statements))?;
        info!(migration = %stem, "wrote migration files");

        Ok((up_path, down_path))
    }
}

/// Joins statements with blank lines and a trailing newline.
fn render_statements(statements: &[String]) -> String {
    if statements.is_empty() {
        return String::new();
    }
    let mut text = statements.join("\n\n");
    text.push('\n');
    text
}

/// Scans existing `NNNN_*.up.sql` files and returns the next number.
fn next_sequence(dir: &Path) -> Result<u32> {
    let mut max = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.ends_with(".up.sql") {
            continue;
        }
        if let Some(prefix) = file_name.split('_').next() {
            if let Ok(n) = prefix.parse::<u32>() {
                max = max.max(n);
            }
        }
    }
    Ok(max + 1)
}

/// Lowercases and replaces anything non-alphanumeric with underscores.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sql() -> MigrationSql {
        MigrationSql {
            up_statements: vec![
                "CREATE TABLE \"users\" (\n    \"id\" SERIAL PRIMARY KEY\n);".to_string(),
                "CREATE INDEX \"idx_users_email\" ON \"users\" (\"email\");".to_string(),
            ],
            down_statements: vec![
                "DROP INDEX \"idx_users_email\";".to_string(),
                "DROP TABLE IF EXISTS \"users\";".to_string(),
            ],
        }
    }

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Add Email Column"), "add_email_column");
        assert_eq!(slugify("create-users!"), "create_users");
        assert_eq!(slugify("  already_ok  "), "already_ok");
    }

    #[test]
    fn writes_numbered_pair() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());

        let (up, down) = writer.write("create users", &sample_sql()).unwrap();
        assert!(up.ends_with("0001_create_users.up.sql"));
        assert!(down.ends_with("0001_create_users.down.sql"));

        let up_text = fs::read_to_string(&up).unwrap();
        // Blank-line separated, executor-splittable.
        assert_eq!(up_text.matches("\n\n").count(), 1);
        assert!(up_text.starts_with("CREATE TABLE"));
    }

    #[test]
    fn sequence_numbers_advance() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());

        let (first, _) = writer.write("one", &sample_sql()).unwrap();
        let (second, _) = writer.write("two", &sample_sql()).unwrap();
        assert!(first.ends_with("0001_one.up.sql"));
        assert!(second.ends_with("0002_two.up.sql"));
    }

    #[test]
    fn written_pair_round_trips_through_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());
        writer.write("create users", &sample_sql()).unwrap();

        let discovered = crate::executor::discover_migrations(dir.path()).unwrap();
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].name, "0001_create_users");
        assert_eq!(discovered[0].up_statements, sample_sql().up_statements);
        assert_eq!(discovered[0].down_statements, sample_sql().down_statements);
    }
}
