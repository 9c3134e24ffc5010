//! TOML encoding of flow documents.
//!
//! Layout:
//!
//! ```toml
//! [flow]
//! name = "billing"
//! active = false
//! version = "0.0.1"
//!
//! [[nodes]]
//! id = "1"
//! type = "trigger"
//! [nodes.position]
//! x = 100.0
//! y = 40.0
//! [nodes.data]
//! label = "Node 1"
//!
//! [[edges]]
//! id = "edge-1-2"
//! source = "1"
//! target = "2"
//! ```

use serde_json::Value;

use super::{DocumentError, FlowDocument};

/// Serialize a document to TOML.
///
/// TOML has no null, so null entries inside node payloads and frontmatter
/// extras are dropped.
pub fn serialize(document: &FlowDocument) -> Result<String, DocumentError> {
    let mut document = document.clone();
    for node in &mut document.nodes {
        node.data.config.retain(|_, v| !v.is_null());
        node.data.config.values_mut().for_each(prune_nulls);
    }
    document.flow.extra.retain(|_, v| !v.is_null());
    document.flow.extra.values_mut().for_each(prune_nulls);

    Ok(toml::to_string(&document)?)
}

/// Parse TOML into a document.
///
/// Missing `nodes`/`edges` sections are empty collections and a missing
/// `[flow]` table is default frontmatter. Blank text is an empty flow.
pub fn parse(text: &str) -> Result<FlowDocument, DocumentError> {
    if text.trim().is_empty() {
        return Ok(FlowDocument::default());
    }
    Ok(toml::from_str(text)?)
}

fn prune_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(prune_nulls);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(prune_nulls);
        }
        _ => {}
    }
}
