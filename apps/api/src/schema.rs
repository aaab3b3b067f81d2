//! Schema description document — the human-written map of the KPI store.
//!
//! Loaded once at startup from a local JSON file. This is configuration, not
//! behavior: the query templates hard-code their SQL, and the document exists
//! so operators can see what the service believes about the store (the health
//! endpoint reports its table inventory). A missing or malformed file is a
//! startup failure, not something to limp past.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Parsed schema description: table name to table documentation.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDoc {
    pub tables: BTreeMap<String, TableDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableDoc {
    #[serde(default)]
    pub description: String,
    /// Column name to column description.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl SchemaDoc {
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Loads the schema description from `path`.
pub fn load_schema_doc(path: &Path) -> Result<SchemaDoc> {
    let raw = std::fs::read_to_string(path).with_context(|| {
        format!("schema description '{}' not found or unreadable", path.display())
    })?;
    serde_json::from_str(&raw)
        .with_context(|| format!("schema description '{}' is not valid JSON", path.display()))
}
