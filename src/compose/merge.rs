//! # Fragment merging.
//!
//! ```text
//! merge(base, [o1, o2, ...])
//!   doc = base
//!   for each overlay in order:
//!     table  + table  → merge key-wise (recursive)
//!     any    + scalar → overlay value wins
//!     any    + array  → overlay array replaces (no element merge)
//! ```
//!
//! The result is a [`Document`] whose keys are kept sorted, so merging the
//! same ordered fragment list always renders to the same bytes.
//!
//! [`merge_json`] applies the same rules to JSON trees and yields a
//! [`JsonDocument`]. JSON outputs never pass through TOML: unsigned integers
//! above `i64::MAX` and `null` are kept as written.

use serde_json::Map;
use toml::{Table, Value};

use super::fragment::Fragment;
use crate::error::ComposeError;

/// Merged configuration tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document(Table);

impl Document {
    /// Borrows the underlying table.
    pub fn as_table(&self) -> &Table {
        &self.0
    }

    /// Looks up a nested value by key path.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_table()?.get(*key)?;
        }
        Some(current)
    }

    /// Renders the document as TOML.
    ///
    /// # Errors
    /// [`ComposeError::Render`] if the encoder rejects the tree.
    pub fn to_toml_string(&self) -> Result<String, ComposeError> {
        toml::to_string(&self.0).map_err(|e| ComposeError::Render {
            format: "toml",
            reason: e.to_string(),
        })
    }
}

impl From<Table> for Document {
    fn from(table: Table) -> Self {
        Self(table)
    }
}

/// Merges `overlays` over `base`, in order.
///
/// # Errors
/// The first fragment that fails to parse, by name.
pub fn merge(base: &Fragment, overlays: &[Fragment]) -> Result<Document, ComposeError> {
    let mut doc = base.to_table()?;
    for overlay in overlays {
        merge_tables(&mut doc, overlay.to_table()?);
    }
    Ok(Document(doc))
}

/// Merges `overlays` over `base` as JSON trees, in order.
///
/// # Errors
/// The first fragment that fails to parse or does not describe an object.
pub fn merge_json(base: &Fragment, overlays: &[Fragment]) -> Result<JsonDocument, ComposeError> {
    let mut doc = base.to_object()?;
    for overlay in overlays {
        merge_objects(&mut doc, overlay.to_object()?);
    }
    Ok(JsonDocument(doc))
}

fn merge_tables(dst: &mut Table, src: Table) {
    for (key, value) in src {
        let incoming = match value {
            Value::Table(incoming) => incoming,
            scalar_or_array => {
                dst.insert(key, scalar_or_array);
                continue;
            }
        };
        if let Some(Value::Table(existing)) = dst.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        dst.insert(key, Value::Table(incoming));
    }
}

fn merge_objects(dst: &mut Map<String, serde_json::Value>, src: Map<String, serde_json::Value>) {
    for (key, value) in src {
        let incoming = match value {
            serde_json::Value::Object(incoming) => incoming,
            scalar_or_array => {
                dst.insert(key, scalar_or_array);
                continue;
            }
        };
        if let Some(serde_json::Value::Object(existing)) = dst.get_mut(&key) {
            merge_objects(existing, incoming);
            continue;
        }
        dst.insert(key, serde_json::Value::Object(incoming));
    }
}

/// Merged JSON tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonDocument(Map<String, serde_json::Value>);

impl JsonDocument {
    /// Borrows the underlying object.
    pub fn as_object(&self) -> &Map<String, serde_json::Value> {
        &self.0
    }

    /// Looks up a nested value by key path.
    pub fn get(&self, path: &[&str]) -> Option<&serde_json::Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Renders the document as pretty JSON with a trailing newline.
    ///
    /// # Errors
    /// [`ComposeError::Render`] if the encoder rejects the tree.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ComposeError> {
        let mut out = serde_json::to_vec_pretty(&self.0).map_err(|e| ComposeError::Render {
            format: "json",
            reason: e.to_string(),
        })?;
        out.push(b'\n');
        Ok(out)
    }
}

impl From<Map<String, serde_json::Value>> for JsonDocument {
    fn from(object: Map<String, serde_json::Value>) -> Self {
        Self(object)
    }
}
