//! Declarative schema loading.
//!
//! Reads a desired-state schema from a JSON file into the normalized
//! model. The core model's serde derives are the file format: a map of
//! table name to table definition. This is the "desired" side of a diff;
//! the introspector supplies the "current" side.

use std::fs;
use std::path::Path;

use tracing::debug;

use strata_core::schema::DatabaseSchema;

use crate::error::Result;

/// Loads a schema declaration from a JSON file.
pub fn load_schema(path: &Path) -> Result<DatabaseSchema> {
    let text = fs::read_to_string(path)?;
    let schema = parse_schema(&text)?;
    debug!(
        path = %path.display(),
        tables = schema.tables.len(),
        "loaded schema declaration"
    );
    Ok(schema)
}

/// Parses a schema declaration from JSON text.
pub fn parse_schema(text: &str) -> Result<DatabaseSchema> {
    Ok(serde_json::from_str(text)?)
}
