//! Migration file linting.
//!
//! Checks migration file text for problems the runner would otherwise
//! only surface at execution time: empty or missing halves, up/down
//! count mismatches, unterminated statements, and destructive changes
//! that deserve a second look before anyone runs them. The validator
//! only reports; it never rewrites files.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::executor::{discover_migrations, MigrationFile};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth reviewing, but the migration can run.
    Warning,
    /// The migration cannot be applied as written.
    Error,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Migration name the finding belongs to.
    pub migration: String,
    /// Finding severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn warning(migration: &str, message: impl Into<String>) -> Self {
        Self {
            migration: migration.to_string(),
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    fn error(migration: &str, message: impl Into<String>) -> Self {
        Self {
            migration: migration.to_string(),
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

fn destructive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bDROP\s+(TABLE|COLUMN)\b").expect("valid regex"))
}

/// Lints a single migration.
#[must_use]
pub fn validate_migration(migration: &MigrationFile) -> Vec<ValidationIssue> {
    let name = &migration.name;
    let mut issues = Vec::new();

    if migration.up_statements.is_empty() {
        issues.push(ValidationIssue::error(name, "up migration is empty"));
        return issues;
    }

    if migration.down_statements.is_empty() {
        issues.push(ValidationIssue::warning(
            name,
            "no down migration; rollback will not be possible",
        ));
    } else if migration.up_statements.len() != migration.down_statements.len() {
        issues.push(ValidationIssue::warning(
            name,
            format!(
                "up has {} statements but down has {}",
                migration.up_statements.len(),
                migration.down_statements.len()
            ),
        ));
    }

    let mut executable = 0;
    for statement in &migration.up_statements {
        if statement.starts_with("--") {
            continue;
        }
        executable += 1;
        if !statement.trim_end().ends_with(';') {
            issues.push(ValidationIssue::warning(
                name,
                format!(
                    "statement is not terminated with ';': {}",
                    first_line(statement)
                ),
            ));
        }
        if destructive_pattern().is_match(statement) {
            issues.push(ValidationIssue::warning(
                name,
                format!("destructive statement: {}", first_line(statement)),
            ));
        }
    }

    if executable == 0 {
        issues.push(ValidationIssue::warning(
            name,
            "contains only comments; nothing will be executed",
        ));
    }

    issues
}

/// Lints every migration pair in a directory.
pub fn validate_dir(dir: &Path) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for migration in discover_migrations(dir)? {
        issues.extend(validate_migration(&migration));
    }
    Ok(issues)
}

fn first_line(statement: &str) -> &str {
    statement.lines().next().unwrap_or(statement)
}
