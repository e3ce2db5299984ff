//! Normalized schema model.
//!
//! These types describe the structure of a database in a dialect-agnostic
//! vocabulary. Both sides of a diff speak this model: the introspector
//! produces it from a live database's catalog, and the schema loader
//! produces it from a declarative schema file.
//!
//! Everything here is an immutable value snapshot: a fact about schema
//! state at one instant, not a live handle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The dialect-agnostic column type vocabulary.
///
/// Native type spellings (`character varying`, `tinyint`, ...) are translated
/// to and from this set at the introspector and generator boundaries. Types
/// outside the vocabulary pass through unchanged, lowercased, in
/// [`SemanticType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Variable-length character string.
    Varchar,
    /// Unbounded text.
    Text,
    /// Boolean.
    Boolean,
    /// Date and time.
    Timestamp,
    /// JSON document.
    Json,
    /// Exact-precision decimal.
    Decimal,
    /// A native type with no semantic equivalent, stored lowercased.
    Other(String),
}

impl SemanticType {
    /// The canonical lowercase name of this type.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Varchar => "varchar",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
            Self::Decimal => "decimal",
            Self::Other(name) => name,
        }
    }

    /// Comparison key used by the differ: lowercased with all whitespace
    /// stripped, so `character varying` and `CharacterVarying` collide.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.name()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    }

    /// Parses a semantic type name, routing unknown names to `Other`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "varchar" => Self::Varchar,
            "text" => Self::Text,
            "boolean" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "json" => Self::Json,
            "decimal" => Self::Decimal,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Referential action for a foreign key (`ON DELETE` / `ON UPDATE`).
///
/// The engine default (`NO ACTION`) is represented as `None` wherever an
/// `Option<ReferentialAction>` appears; the introspector normalizes the
/// `NO ACTION` sentinel away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Reject the delete/update while references exist.
    Restrict,
    /// Set the referencing column to NULL.
    SetNull,
    /// Set the referencing column to its default value.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL spelling of this action.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses a catalog rule string, normalizing the `NO ACTION` sentinel
    /// (and empty strings) to `None`.
    #[must_use]
    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim().to_uppercase().as_str() {
            "CASCADE" => Some(Self::Cascade),
            "RESTRICT" => Some(Self::Restrict),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// A single column's normalized definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// Normalized semantic type.
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Whether the column rejects NULL values.
    #[serde(default)]
    pub not_null: bool,
    /// Default expression in dialect-native syntax, compared as opaque text.
    #[serde(default)]
    pub default: Option<String>,
    /// Whether this column participates in the table's primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the engine auto-generates values on insert.
    #[serde(default)]
    pub auto_increment: bool,
}

impl Column {
    /// Creates a nullable column of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            not_null: false,
            default: None,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as part of the primary key. Primary key columns
    /// are always NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Marks the column auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default expression (dialect-native text).
    #[must_use]
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// A secondary index. Column order is the index key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Index name, unique within its table.
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A single-column foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name, unique within the owning table.
    pub name: String,
    /// Referencing column in the owning table.
    pub column: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
    /// ON DELETE action; `None` means the engine default (NO ACTION).
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action; `None` means the engine default (NO ACTION).
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKey {
    /// Creates a foreign key with default referential actions.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// A single table's complete normalized definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name, unique within the schema.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Secondary indexes, names unique within the table.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Foreign keys, names unique within the table.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Primary key columns in key order; more than one entry means a
    /// composite key. Must be consistent with each column's `primary_key`
    /// flag.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Creates an empty table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Adds a column, extending `primary_key` if the column is flagged.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        if column.primary_key && !self.primary_key.contains(&column.name) {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index_named(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Looks up a foreign key by name.
    #[must_use]
    pub fn foreign_key_named(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }
}

/// A complete database schema: tables keyed by name.
///
/// The sorted map fixes iteration order, so diffs over the same pair of
/// schemas are reproducible regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseSchema {
    /// Tables keyed by table name.
    pub tables: BTreeMap<String, TableSchema>,
}

impl DatabaseSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a table, keyed by its own name.
    pub fn add_table(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Builder-style [`add_table`](Self::add_table).
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.add_table(table);
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table_named(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Returns `true` if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_builder() {
        let col = Column::new("id", SemanticType::Integer)
            .primary_key()
            .auto_increment();

        assert_eq!(col.name, "id");
        assert!(col.primary_key);
        assert!(col.auto_increment);
        // Primary keys are always NOT NULL.
        assert!(col.not_null);
    }

    #[test]
    fn table_builder_collects_primary_key() {
        let table = TableSchema::new("users")
            .column(Column::new("id", SemanticType::Integer).primary_key())
            .column(Column::new("email", SemanticType::Varchar).not_null());

        assert_eq!(table.primary_key, vec!["id"]);
        assert!(table.column_named("email").is_some());
        assert!(table.column_named("missing").is_none());
    }

    #[test]
    fn semantic_type_normalization() {
        assert_eq!(SemanticType::Varchar.normalized(), "varchar");
        assert_eq!(
            SemanticType::Other("double precision".into()).normalized(),
            "doubleprecision"
        );
        assert_eq!(SemanticType::parse("BIGINT"), SemanticType::BigInt);
        assert_eq!(
            SemanticType::parse("tsvector"),
            SemanticType::Other("tsvector".into())
        );
    }

    #[test]
    fn referential_action_rules() {
        assert_eq!(
            ReferentialAction::from_rule("CASCADE"),
            Some(ReferentialAction::Cascade)
        );
        assert_eq!(
            ReferentialAction::from_rule("set null"),
            Some(ReferentialAction::SetNull)
        );
        // The engine default normalizes away.
        assert_eq!(ReferentialAction::from_rule("NO ACTION"), None);
        assert_eq!(ReferentialAction::from_rule(""), None);
    }

    #[test]
    fn schema_iteration_is_sorted() {
        let schema = DatabaseSchema::new()
            .table(TableSchema::new("zebras"))
            .table(TableSchema::new("aardvarks"));

        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["aardvarks", "zebras"]);
    }

    #[test]
    fn schema_json_round_trip() {
        let schema = DatabaseSchema::new().table(
            TableSchema::new("users")
                .column(
                    Column::new("id", SemanticType::Integer)
                        .primary_key()
                        .auto_increment(),
                )
                .index(Index::new("idx_users_email", vec!["email".into()]).unique())
                .foreign_key(
                    ForeignKey::new("fk_users_org", "org_id", "orgs", "id")
                        .on_delete(ReferentialAction::Cascade),
                ),
        );

        let json = serde_json::to_string(&schema).unwrap();
        let back: DatabaseSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
