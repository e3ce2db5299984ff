//! Dialect-aware SQL generation.
//!
//! Each supported engine family implements [`SqlDialect`], the capability
//! interface covering identifier quoting, the semantic-to-native type map,
//! column definition rendering, and the per-change DDL renderers. Engine
//! quirks (SQLite's inability to drop or alter columns, MySQL's
//! table-scoped index names) live entirely inside the variant that owns
//! them.
//!
//! [`SqlGenerator`] selects a variant once at construction and turns an
//! ordered list of [`SchemaChange`] values into a forward ("up") and an
//! exact-inverse ("down") statement sequence.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::change::{SchemaChange, TableChange};
use crate::schema::{Column, ForeignKey, Index, SemanticType, TableSchema};

/// The supported engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL-compatible engines.
    Postgres,
    /// MySQL-compatible engines.
    MySql,
    /// SQLite-compatible engines.
    Sqlite,
}

impl Dialect {
    /// The canonical configuration name of this dialect.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized dialect name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown dialect '{0}', expected postgresql, mysql, or sqlite")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

/// The rendered output of a generation pass: parallel forward and inverse
/// statement sequences. `down_statements` is the exact reverse of
/// `up_statements`, change for change, so the two always have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSql {
    /// Statements that apply the desired state, in dependency-safe order.
    pub up_statements: Vec<String>,
    /// Statements that undo the change set, in reverse dependency order.
    pub down_statements: Vec<String>,
}

impl MigrationSql {
    /// Returns `true` if the change set rendered to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.up_statements.is_empty()
    }
}

/// Capability interface for one engine family's DDL rendering.
///
/// Provided methods cover the syntax the three engines share; each variant
/// implements or overrides only where its dialect actually differs.
pub trait SqlDialect {
    /// Dialect name as used in configuration.
    fn name(&self) -> &'static str;

    /// The identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes a table/column/index/constraint name.
    fn quote_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        format!("{q}{name}{q}")
    }

    /// Maps a semantic type to this dialect's native spelling. Must be
    /// total: unmapped types fall back to the uppercased semantic name.
    fn type_sql(&self, ty: &SemanticType) -> String;

    /// Clause appended to a column definition for auto-increment columns.
    /// Only meaningful for dialects that keep the generic definition shape.
    fn auto_increment_clause(&self) -> &'static str {
        ""
    }

    /// The shared column-definition template:
    /// `<name> <type>[ NOT NULL][ PRIMARY KEY][ <auto-inc>][ DEFAULT <v>]`.
    ///
    /// `single_pk` is whether an inline PRIMARY KEY clause is allowed here
    /// (single-column key); composite keys render as a table constraint
    /// instead. Not meant to be overridden; dialects override
    /// [`column_definition`](Self::column_definition).
    fn generic_column_definition(&self, col: &Column, single_pk: bool) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&col.name),
            self.type_sql(&col.ty)
        );
        if col.not_null {
            sql.push_str(" NOT NULL");
        }
        if col.primary_key && single_pk && !col.auto_increment {
            sql.push_str(" PRIMARY KEY");
        }
        if col.auto_increment {
            sql.push_str(self.auto_increment_clause());
        }
        if let Some(ref default) = col.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }

    /// Renders a full column definition, including any dialect-specific
    /// auto-increment shape.
    fn column_definition(&self, col: &Column, single_pk: bool) -> String;

    /// `CREATE TABLE` with all column definitions and, for composite keys,
    /// a trailing `PRIMARY KEY (...)` table constraint.
    fn create_table(&self, table: &TableSchema) -> String {
        let single_pk = table.primary_key.len() <= 1;
        let mut sql = format!("CREATE TABLE {} (\n", self.quote_identifier(&table.name));
        let col_defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c, single_pk)))
            .collect();
        sql.push_str(&col_defs.join(",\n"));
        if table.primary_key.len() > 1 {
            let quoted: Vec<String> = table
                .primary_key
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect();
            sql.push_str(&format!(",\n    PRIMARY KEY ({})", quoted.join(", ")));
        }
        sql.push_str("\n)");
        sql
    }

    /// `DROP TABLE IF EXISTS`.
    fn drop_table(&self, table: &TableSchema) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(&table.name))
    }

    /// `ALTER TABLE ... ADD COLUMN`.
    fn add_column(&self, table: &str, col: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(col, col.primary_key)
        )
    }

    /// `ALTER TABLE ... DROP COLUMN`, or a comment where unsupported.
    fn drop_column(&self, table: &str, col: &Column) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(&col.name)
        )
    }

    /// Dialect-specific column alteration using the given target
    /// definition, or a comment where unsupported.
    fn modify_column(&self, table: &str, target: &Column) -> String;

    /// `CREATE [UNIQUE] INDEX ... ON ... (...)`.
    fn create_index(&self, table: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let cols: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            cols.join(", ")
        )
    }

    /// `DROP INDEX`; MySQL scopes index names to their table.
    fn drop_index(&self, table: &str, index: &Index) -> String;

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`, or a comment
    /// where unsupported.
    fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name),
            self.quote_identifier(&fk.column),
            self.quote_identifier(&fk.referenced_table),
            self.quote_identifier(&fk.referenced_column)
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    /// `ALTER TABLE ... DROP CONSTRAINT`, or a comment where unsupported.
    fn drop_foreign_key(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name)
        )
    }
}

/// Execution rank per change type. Constraints and indexes referencing
/// soon-to-be-dropped structures go first; new tables must exist before
/// anything targets them.
fn change_rank(change: &SchemaChange) -> u8 {
    match change {
        SchemaChange::DropForeignKey { .. } => 0,
        SchemaChange::DropIndex { .. } => 1,
        SchemaChange::AlterTable { .. } => 2,
        SchemaChange::DropTable { .. } => 3,
        SchemaChange::CreateTable { .. } => 4,
        SchemaChange::CreateIndex { .. } => 5,
        SchemaChange::AddForeignKey { .. } => 6,
    }
}

/// Renders one change into its (up, down) statement pairs. Every change
/// yields exactly one pair, except `AlterTable` which yields one pair per
/// nested column change.
fn statement_pairs(dialect: &dyn SqlDialect, change: &SchemaChange) -> Vec<(String, String)> {
    match change {
        SchemaChange::CreateTable { table } => {
            vec![(dialect.create_table(table), dialect.drop_table(table))]
        }
        SchemaChange::DropTable { table } => {
            vec![(dialect.drop_table(table), dialect.create_table(table))]
        }
        SchemaChange::AlterTable { table, changes } => changes
            .iter()
            .map(|tc| match tc {
                TableChange::AddColumn { column } => (
                    dialect.add_column(table, column),
                    dialect.drop_column(table, column),
                ),
                TableChange::DropColumn { column } => (
                    dialect.drop_column(table, column),
                    dialect.add_column(table, column),
                ),
                TableChange::ModifyColumn { current, desired } => (
                    dialect.modify_column(table, desired),
                    dialect.modify_column(table, current),
                ),
            })
            .collect(),
        SchemaChange::CreateIndex { table, index } => {
            vec![(
                dialect.create_index(table, index),
                dialect.drop_index(table, index),
            )]
        }
        SchemaChange::DropIndex { table, index } => {
            vec![(
                dialect.drop_index(table, index),
                dialect.create_index(table, index),
            )]
        }
        SchemaChange::AddForeignKey { table, foreign_key } => {
            vec![(
                dialect.add_foreign_key(table, foreign_key),
                dialect.drop_foreign_key(table, foreign_key),
            )]
        }
        SchemaChange::DropForeignKey { table, foreign_key } => {
            vec![(
                dialect.drop_foreign_key(table, foreign_key),
                dialect.add_foreign_key(table, foreign_key),
            )]
        }
    }
}

/// Terminates an executable statement with `;`. Comment statements
/// (dialect capability gaps) stay bare.
fn terminate(statement: String) -> String {
    if statement.starts_with("--") {
        statement
    } else {
        format!("{statement};")
    }
}

/// Renders ordered change lists into up/down SQL for one dialect,
/// selected once at construction.
pub struct SqlGenerator {
    dialect: Box<dyn SqlDialect + Send + Sync>,
    tag: Dialect,
}

impl SqlGenerator {
    /// Creates a generator for the given dialect.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        let imp: Box<dyn SqlDialect + Send + Sync> = match dialect {
            Dialect::Postgres => Box::new(PostgresDialect::new()),
            Dialect::MySql => Box::new(MySqlDialect::new()),
            Dialect::Sqlite => Box::new(SqliteDialect::new()),
        };
        Self { dialect: imp, tag: dialect }
    }

    /// The dialect this generator renders.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.tag
    }

    /// Renders the change set into forward and inverse statement
    /// sequences.
    ///
    /// Changes are stable-sorted by execution rank before rendering, and
    /// each change's inverse is prepended to the down sequence as it is
    /// processed, so the down sequence ends up in exactly reverse
    /// dependency order. Dialect capability gaps render as explanatory
    /// comments instead of statements, keeping the two sequences the same
    /// length.
    #[must_use]
    pub fn generate(&self, changes: &[SchemaChange]) -> MigrationSql {
        let mut ordered: Vec<&SchemaChange> = changes.iter().collect();
        ordered.sort_by_key(|c| change_rank(c));

        let mut up_statements = Vec::new();
        let mut down_statements = Vec::new();
        for change in ordered {
            for (up, down) in statement_pairs(self.dialect.as_ref(), change) {
                up_statements.push(terminate(up));
                down_statements.insert(0, terminate(down));
            }
        }

        MigrationSql {
            up_statements,
            down_statements,
        }
    }
}

impl fmt::Debug for SqlGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlGenerator")
            .field("dialect", &self.tag)
            .finish()
    }
}
