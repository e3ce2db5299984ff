//! Schema diff engine.
//!
//! Compares a "current" (live database) and a "desired" (declared)
//! [`DatabaseSchema`] and produces the ordered list of [`SchemaChange`]
//! values needed to migrate from current to desired.
//!
//! The differ is a pure function: no I/O, no side effects, and
//! deterministic output for a given input pair (table iteration follows
//! the schemas' sorted map order). It never decides execution order across
//! tables: that is the SQL generator's job.

use crate::change::{SchemaChange, TableChange};
use crate::schema::{Column, DatabaseSchema, ForeignKey, Index, TableSchema};

/// Compares two database schemas and returns the changes that turn
/// `current` into `desired`.
#[must_use]
pub fn diff(current: &DatabaseSchema, desired: &DatabaseSchema) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    // ---- Tables only in current -> DropTable -------------------
    // The full definition rides along so the down migration can
    // recreate the table.
    for (name, table) in &current.tables {
        if !desired.tables.contains_key(name) {
            changes.push(SchemaChange::DropTable {
                table: table.clone(),
            });
        }
    }

    // ---- Tables only in desired -> CreateTable -----------------
    // A brand-new table has no drop/alter counterparts, so its indexes
    // and foreign keys become standalone create/add changes here.
    for (name, table) in &desired.tables {
        if !current.tables.contains_key(name) {
            changes.push(SchemaChange::CreateTable {
                table: table.clone(),
            });
            for index in &table.indexes {
                changes.push(SchemaChange::CreateIndex {
                    table: name.clone(),
                    index: index.clone(),
                });
            }
            for fk in &table.foreign_keys {
                changes.push(SchemaChange::AddForeignKey {
                    table: name.clone(),
                    foreign_key: fk.clone(),
                });
            }
        }
    }

    // ---- Tables in both -> column/index/FK diff ----------------
    for (name, desired_table) in &desired.tables {
        if let Some(current_table) = current.tables.get(name) {
            let column_changes = diff_columns(current_table, desired_table);
            if !column_changes.is_empty() {
                changes.push(SchemaChange::AlterTable {
                    table: name.clone(),
                    changes: column_changes,
                });
            }
            diff_indexes(name, current_table, desired_table, &mut changes);
            diff_foreign_keys(name, current_table, desired_table, &mut changes);
        }
    }

    changes
}

// ================================================================
// Column diff
// ================================================================

/// Diffs the columns of a table present in both schemas.
///
/// Adds and modifies follow desired-column order; drops follow
/// current-column order.
fn diff_columns(current: &TableSchema, desired: &TableSchema) -> Vec<TableChange> {
    let mut changes = Vec::new();

    for desired_col in &desired.columns {
        match current.column_named(&desired_col.name) {
            None => changes.push(TableChange::AddColumn {
                column: desired_col.clone(),
            }),
            Some(current_col) => {
                if columns_differ(current_col, desired_col) {
                    changes.push(TableChange::ModifyColumn {
                        current: current_col.clone(),
                        desired: desired_col.clone(),
                    });
                }
            }
        }
    }

    for current_col in &current.columns {
        if desired.column_named(&current_col.name).is_none() {
            changes.push(TableChange::DropColumn {
                column: current_col.clone(),
            });
        }
    }

    changes
}

/// Whether two same-named columns have materially different definitions.
///
/// Composite primary keys are only observed through the per-column flag
/// here; a reordering of the table-level `primary_key` sequence that flips
/// no flag goes undetected.
fn columns_differ(current: &Column, desired: &Column) -> bool {
    current.ty.normalized() != desired.ty.normalized()
        || current.not_null != desired.not_null
        || current.primary_key != desired.primary_key
        || normalize_default(current.default.as_deref())
            != normalize_default(desired.default.as_deref())
}

/// Strips surrounding whitespace and quote characters from a default
/// expression so `'active'` and `active` compare equal. Defaults are
/// otherwise opaque text: `0` and `0.0` stay different.
fn normalize_default(default: Option<&str>) -> Option<String> {
    default.map(|raw| {
        raw.trim()
            .trim_matches(|c| c == '\'' || c == '"')
            .trim()
            .to_string()
    })
}

// ================================================================
// Index diff
// ================================================================

/// Whether two same-named indexes have the same definition: uniqueness,
/// column count, and every column position.
fn indexes_equal(a: &Index, b: &Index) -> bool {
    a.unique == b.unique && a.columns == b.columns
}

/// Diffs indexes matched by name. A changed index is always dropped and
/// recreated, never altered in place.
fn diff_indexes(
    table: &str,
    current: &TableSchema,
    desired: &TableSchema,
    changes: &mut Vec<SchemaChange>,
) {
    for current_idx in &current.indexes {
        if desired.index_named(&current_idx.name).is_none() {
            changes.push(SchemaChange::DropIndex {
                table: table.to_string(),
                index: current_idx.clone(),
            });
        }
    }
    for desired_idx in &desired.indexes {
        match current.index_named(&desired_idx.name) {
            None => changes.push(SchemaChange::CreateIndex {
                table: table.to_string(),
                index: desired_idx.clone(),
            }),
            Some(current_idx) => {
                if !indexes_equal(current_idx, desired_idx) {
                    changes.push(SchemaChange::DropIndex {
                        table: table.to_string(),
                        index: current_idx.clone(),
                    });
                    changes.push(SchemaChange::CreateIndex {
                        table: table.to_string(),
                        index: desired_idx.clone(),
                    });
                }
            }
        }
    }
}

// ================================================================
// Foreign key diff
// ================================================================

/// Whether two same-named foreign keys have the same definition.
fn foreign_keys_equal(a: &ForeignKey, b: &ForeignKey) -> bool {
    a.column == b.column
        && a.referenced_table == b.referenced_table
        && a.referenced_column == b.referenced_column
        && a.on_delete == b.on_delete
        && a.on_update == b.on_update
}

/// Diffs foreign keys matched by name, drop-then-add on change.
fn diff_foreign_keys(
    table: &str,
    current: &TableSchema,
    desired: &TableSchema,
    changes: &mut Vec<SchemaChange>,
) {
    for current_fk in &current.foreign_keys {
        if desired.foreign_key_named(&current_fk.name).is_none() {
            changes.push(SchemaChange::DropForeignKey {
                table: table.to_string(),
                foreign_key: current_fk.clone(),
            });
        }
    }
    for desired_fk in &desired.foreign_keys {
        match current.foreign_key_named(&desired_fk.name) {
            None => changes.push(SchemaChange::AddForeignKey {
                table: table.to_string(),
                foreign_key: desired_fk.clone(),
            }),
            Some(current_fk) => {
                if !foreign_keys_equal(current_fk, desired_fk) {
                    changes.push(SchemaChange::DropForeignKey {
                        table: table.to_string(),
                        foreign_key: current_fk.clone(),
                    });
                    changes.push(SchemaChange::AddForeignKey {
                        table: table.to_string(),
                        foreign_key: desired_fk.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ReferentialAction, SemanticType};

    // ============================================================
    // Helpers
    // ============================================================

    fn users_table() -> TableSchema {
        TableSchema::new("users")
            .column(
                Column::new("id", SemanticType::Integer)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("email", SemanticType::Varchar).not_null())
    }

    fn schema_of(tables: Vec<TableSchema>) -> DatabaseSchema {
        let mut schema = DatabaseSchema::new();
        for t in tables {
            schema.add_table(t);
        }
        schema
    }

    // ============================================================
    // Table-level
    // ============================================================

    #[test]
    fn diff_of_self_is_empty() {
        let schema = schema_of(vec![users_table()]);
        assert!(diff(&schema, &schema).is_empty());
    }

    #[test]
    fn diff_of_empty_schemas_is_empty() {
        let empty = DatabaseSchema::new();
        assert!(diff(&empty, &empty).is_empty());
    }

    #[test]
    fn new_table_produces_create_table() {
        let current = DatabaseSchema::new();
        let desired = schema_of(vec![users_table()]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            SchemaChange::CreateTable { table } if table.name == "users"
        ));
    }

    #[test]
    fn new_table_brings_its_indexes_and_foreign_keys() {
        let table = users_table()
            .column(Column::new("org_id", SemanticType::Integer).not_null())
            .index(Index::new("idx_users_email", vec!["email".into()]).unique())
            .foreign_key(
                ForeignKey::new("fk_users_org_id", "org_id", "orgs", "id")
                    .on_delete(ReferentialAction::Cascade),
            );
        let changes = diff(&DatabaseSchema::new(), &schema_of(vec![table]));

        assert_eq!(changes.len(), 3);
        assert!(matches!(&changes[0], SchemaChange::CreateTable { .. }));
        assert!(matches!(
            &changes[1],
            SchemaChange::CreateIndex { index, .. } if index.name == "idx_users_email"
        ));
        assert!(matches!(
            &changes[2],
            SchemaChange::AddForeignKey { foreign_key, .. }
                if foreign_key.name == "fk_users_org_id"
        ));
    }

    #[test]
    fn removed_table_produces_drop_table_with_definition() {
        let current = schema_of(vec![users_table()]);
        let changes = diff(&current, &DatabaseSchema::new());

        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::DropTable { table } => {
                assert_eq!(table.name, "users");
                // Retained definition is what makes the inverse possible.
                assert_eq!(table.columns.len(), 2);
            }
            other => panic!("expected DropTable, got {other:?}"),
        }
    }

    // ============================================================
    // Column-level
    // ============================================================

    #[test]
    fn added_column_detected() {
        let current = schema_of(vec![TableSchema::new("users")
            .column(Column::new("id", SemanticType::Integer).primary_key())]);
        let desired = schema_of(vec![users_table()]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::AlterTable { table, changes } => {
                assert_eq!(table, "users");
                assert_eq!(changes.len(), 1);
                assert!(matches!(
                    &changes[0],
                    TableChange::AddColumn { column } if column.name == "email"
                ));
            }
            other => panic!("expected AlterTable, got {other:?}"),
        }
    }

    #[test]
    fn dropped_column_detected_with_definition() {
        let current = schema_of(vec![users_table()]);
        let desired = schema_of(vec![TableSchema::new("users")
            .column(Column::new("id", SemanticType::Integer).primary_key())]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::AlterTable { changes, .. } => {
                assert_eq!(changes.len(), 1);
                match &changes[0] {
                    TableChange::DropColumn { column } => {
                        assert_eq!(column.name, "email");
                        // Full definition retained for the down re-add.
                        assert_eq!(column.ty, SemanticType::Varchar);
                        assert!(column.not_null);
                    }
                    other => panic!("expected DropColumn, got {other:?}"),
                }
            }
            other => panic!("expected AlterTable, got {other:?}"),
        }
    }

    #[test]
    fn type_change_detected_as_modify() {
        let current = schema_of(vec![TableSchema::new("t")
            .column(Column::new("score", SemanticType::Integer))]);
        let desired = schema_of(vec![TableSchema::new("t")
            .column(Column::new("score", SemanticType::BigInt))]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::AlterTable { changes, .. } => {
                assert!(matches!(
                    &changes[0],
                    TableChange::ModifyColumn { current, desired }
                        if current.ty == SemanticType::Integer
                            && desired.ty == SemanticType::BigInt
                ));
            }
            other => panic!("expected AlterTable, got {other:?}"),
        }
    }

    #[test]
    fn not_null_change_detected() {
        let current = schema_of(vec![TableSchema::new("t")
            .column(Column::new("email", SemanticType::Varchar))]);
        let desired = schema_of(vec![TableSchema::new("t")
            .column(Column::new("email", SemanticType::Varchar).not_null())]);

        assert_eq!(diff(&current, &desired).len(), 1);
    }

    #[test]
    fn primary_key_flag_change_detected() {
        let current = schema_of(vec![TableSchema::new("t")
            .column(Column::new("code", SemanticType::Varchar).not_null())]);
        let desired = schema_of(vec![TableSchema::new("t")
            .column(Column::new("code", SemanticType::Varchar).primary_key())]);

        assert_eq!(diff(&current, &desired).len(), 1);
    }

    #[test]
    fn default_comparison_strips_quotes_and_whitespace() {
        let current = schema_of(vec![TableSchema::new("t")
            .column(Column::new("state", SemanticType::Varchar).default_value("'active'"))]);
        let desired = schema_of(vec![TableSchema::new("t")
            .column(Column::new("state", SemanticType::Varchar).default_value("  active "))]);

        // Equal after loose normalization: no change.
        assert!(diff(&current, &desired).is_empty());
    }

    #[test]
    fn default_value_change_detected() {
        let current = schema_of(vec![TableSchema::new("t")
            .column(Column::new("retries", SemanticType::Integer).default_value("0"))]);
        let desired = schema_of(vec![TableSchema::new("t")
            .column(Column::new("retries", SemanticType::Integer).default_value("3"))]);

        assert_eq!(diff(&current, &desired).len(), 1);
    }

    #[test]
    fn unchanged_table_contributes_nothing() {
        let mixed_current = schema_of(vec![users_table(), TableSchema::new("logs")]);
        let mixed_desired = schema_of(vec![
            users_table(),
            TableSchema::new("logs").column(Column::new("line", SemanticType::Text)),
        ]);

        let changes = diff(&mixed_current, &mixed_desired);
        // Only `logs` changed; `users` is silent.
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].table_name(), "logs");
    }

    #[test]
    fn empty_columns_table_does_not_panic() {
        let current = schema_of(vec![TableSchema::new("weird")]);
        let desired = schema_of(vec![TableSchema::new("weird")]);
        assert!(diff(&current, &desired).is_empty());
    }

    // ============================================================
    // Index-level
    // ============================================================

    #[test]
    fn index_added_and_dropped_by_name() {
        let current = schema_of(vec![users_table()
            .index(Index::new("idx_old", vec!["email".into()]))]);
        let desired = schema_of(vec![users_table()
            .index(Index::new("idx_new", vec!["email".into()]))]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            SchemaChange::DropIndex { index, .. } if index.name == "idx_old"
        ));
        assert!(matches!(
            &changes[1],
            SchemaChange::CreateIndex { index, .. } if index.name == "idx_new"
        ));
    }

    #[test]
    fn index_uniqueness_change_is_drop_then_create() {
        let current = schema_of(vec![users_table()
            .index(Index::new("idx_x", vec!["email".into()]))]);
        let desired = schema_of(vec![users_table()
            .index(Index::new("idx_x", vec!["email".into()]).unique())]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 2);
        match (&changes[0], &changes[1]) {
            (
                SchemaChange::DropIndex { index: dropped, .. },
                SchemaChange::CreateIndex { index: created, .. },
            ) => {
                assert_eq!(dropped.name, "idx_x");
                assert!(!dropped.unique);
                assert_eq!(created.name, "idx_x");
                assert!(created.unique);
            }
            other => panic!("expected drop then create, got {other:?}"),
        }
    }

    #[test]
    fn index_column_order_change_is_drop_then_create() {
        let current = schema_of(vec![users_table()
            .index(Index::new("idx_x", vec!["a".into(), "b".into()]))]);
        let desired = schema_of(vec![users_table()
            .index(Index::new("idx_x", vec!["b".into(), "a".into()]))]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], SchemaChange::DropIndex { .. }));
        assert!(matches!(&changes[1], SchemaChange::CreateIndex { .. }));
    }

    // ============================================================
    // Foreign-key-level
    // ============================================================

    #[test]
    fn foreign_key_added_detected() {
        let current = schema_of(vec![users_table()]);
        let desired = schema_of(vec![users_table().foreign_key(ForeignKey::new(
            "fk_users_org_id",
            "org_id",
            "orgs",
            "id",
        ))]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            SchemaChange::AddForeignKey { foreign_key, .. }
                if foreign_key.name == "fk_users_org_id"
        ));
    }

    #[test]
    fn foreign_key_action_change_is_drop_then_add() {
        let base = ForeignKey::new("fk_posts_user_id", "user_id", "users", "id");
        let current = schema_of(vec![TableSchema::new("posts").foreign_key(base.clone())]);
        let desired = schema_of(vec![TableSchema::new("posts")
            .foreign_key(base.on_delete(ReferentialAction::Cascade))]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], SchemaChange::DropForeignKey { .. }));
        match &changes[1] {
            SchemaChange::AddForeignKey { foreign_key, .. } => {
                assert_eq!(foreign_key.on_delete, Some(ReferentialAction::Cascade));
            }
            other => panic!("expected AddForeignKey, got {other:?}"),
        }
    }

    #[test]
    fn foreign_key_removed_detected_with_definition() {
        let current = schema_of(vec![TableSchema::new("posts").foreign_key(
            ForeignKey::new("fk_posts_user_id", "user_id", "users", "id")
                .on_delete(ReferentialAction::SetNull),
        )]);
        let desired = schema_of(vec![TableSchema::new("posts")]);

        let changes = diff(&current, &desired);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            SchemaChange::DropForeignKey { foreign_key, .. } => {
                assert_eq!(foreign_key.referenced_table, "users");
                assert_eq!(foreign_key.on_delete, Some(ReferentialAction::SetNull));
            }
            other => panic!("expected DropForeignKey, got {other:?}"),
        }
    }
}
