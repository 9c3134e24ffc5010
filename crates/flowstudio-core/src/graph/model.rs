//! Node, edge and frontmatter model - the records persisted in flow.toml.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node payload: a display label plus free-form configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub label: String,

    /// Everything else the node carries (action settings, form values, ...)
    #[serde(flatten)]
    pub config: BTreeMap<String, Value>,
}

impl NodeData {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            config: BTreeMap::new(),
        }
    }

    /// Build a payload from a JSON object; a `label` key becomes the label.
    pub fn from_json(value: Value) -> Self {
        let mut data = Self::default();
        data.merge_json(value);
        data
    }

    /// Overlay the keys of a JSON object onto this payload.
    ///
    /// Non-object values are ignored.
    pub fn merge_json(&mut self, value: Value) {
        let Value::Object(map) = value else {
            return;
        };
        for (key, value) in map {
            if key == "label" {
                if let Value::String(label) = value {
                    self.label = label;
                }
                continue;
            }
            self.config.insert(key, value);
        }
    }
}

/// A single step in a flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the flow
    pub id: String,

    /// Node type tag (trigger, action, ...)
    #[serde(rename = "type", default)]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub data: NodeData,

    /// Canvas selection; never persisted
    #[serde(skip)]
    pub selected: bool,

    /// Set while the node is being dragged; never persisted
    #[serde(skip)]
    pub dragging: bool,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,

    pub source: String,

    pub target: String,

    #[serde(
        default,
        rename = "sourceHandle",
        alias = "source_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,

    #[serde(
        default,
        rename = "targetHandle",
        alias = "target_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,

    /// Canvas selection; never persisted
    #[serde(skip)]
    pub selected: bool,
}

impl Edge {
    /// True when either endpoint is `node_id`.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Same endpoints and handles, ignoring the id.
    pub fn same_connection(&self, other: &Edge) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

/// Flow-level metadata stored under `[flow]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowFrontmatter {
    pub name: String,

    pub active: bool,

    pub version: String,

    /// Backend identifier, once the flow has been registered remotely
    #[serde(alias = "flowId", skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unknown keys survive a load/save cycle
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FlowFrontmatter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: false,
            version: "0.0.1".to_string(),
            ..Self::default()
        }
    }

    /// Apply the set fields of a patch; returns whether anything changed.
    pub fn apply(&mut self, patch: FrontmatterPatch) -> bool {
        let before = self.clone();
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(version) = patch.version {
            self.version = version;
        }
        if let Some(flow_id) = patch.flow_id {
            self.flow_id = Some(flow_id);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        *self != before
    }
}

/// Partial update of the frontmatter (settings panel edits).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontmatterPatch {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub version: Option<String>,
    pub flow_id: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_json_lifts_label() {
        let data = NodeData::from_json(json!({
            "label": "Send email",
            "to": "ops@example.com",
            "retries": 2,
        }));

        assert_eq!(data.label, "Send email");
        assert_eq!(data.config.get("to"), Some(&json!("ops@example.com")));
        assert_eq!(data.config.get("retries"), Some(&json!(2)));
        assert!(!data.config.contains_key("label"));
    }

    #[test]
    fn frontmatter_patch_reports_change() {
        let mut flow = FlowFrontmatter::named("billing");
        assert!(!flow.apply(FrontmatterPatch::default()));

        let changed = flow.apply(FrontmatterPatch {
            active: Some(true),
            ..FrontmatterPatch::default()
        });
        assert!(changed);
        assert!(flow.active);
        assert_eq!(flow.version, "0.0.1");
    }

    #[test]
    fn edge_touches_either_endpoint() {
        let edge = Edge {
            id: "e1-2".into(),
            source: "1".into(),
            target: "2".into(),
            ..Edge::default()
        };
        assert!(edge.touches("1"));
        assert!(edge.touches("2"));
        assert!(!edge.touches("3"));
    }
}
