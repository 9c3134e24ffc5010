//! Graph store - the in-memory node/edge/frontmatter triple of one flow.

use std::collections::HashSet;

use serde_json::Value;

use super::changes::{self, EdgeChange, NodeChange};
use super::model::{Edge, FlowFrontmatter, FrontmatterPatch, Node, NodeData, Position};
use crate::config::EdgePolicy;
use crate::document::FlowDocument;

/// Next node id: highest numeric id present plus one.
///
/// Ids that are not integers are skipped. When the highest id is `u64::MAX`
/// the lowest free positive number is used instead. Unique within one local
/// session only; two editors allocating concurrently can collide.
pub fn next_node_id(nodes: &[Node]) -> String {
    let taken: HashSet<u64> = nodes
        .iter()
        .filter_map(|n| n.id.parse::<u64>().ok())
        .collect();
    let max = taken.iter().copied().max().unwrap_or(0);
    let next = match max.checked_add(1) {
        Some(next) => next,
        None => (1..u64::MAX).find(|n| !taken.contains(n)).unwrap_or(0),
    };
    next.to_string()
}

/// Holds the graph of one open flow.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    frontmatter: FlowFrontmatter,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    policy: EdgePolicy,
}

impl GraphStore {
    pub fn new(policy: EdgePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a store holding a parsed document
    pub fn from_document(document: FlowDocument, policy: EdgePolicy) -> Self {
        let mut store = Self::new(policy);
        store.replace(document);
        store
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn frontmatter(&self) -> &FlowFrontmatter {
        &self.frontmatter
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges with `node_id` as source or target
    pub fn edges_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Insert a node under the next free id and return that id.
    ///
    /// The label defaults to `Node <id>` unless `payload` carries one.
    pub fn add_node(&mut self, node_type: &str, position: Position, payload: Value) -> String {
        let id = next_node_id(&self.nodes);
        let mut data = NodeData::labeled(format!("Node {}", id));
        data.merge_json(payload);

        tracing::debug!(node_id = %id, node_type, "Adding node");
        self.nodes.push(Node {
            id: id.clone(),
            node_type: node_type.to_string(),
            position,
            data,
            ..Node::default()
        });
        id
    }

    /// Apply a node change batch. Edges attached to removed nodes go too.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> Vec<String> {
        let removed = changes::apply_node_changes(changes, &mut self.nodes);
        if !removed.is_empty() {
            let before = self.edges.len();
            self.edges
                .retain(|e| !removed.iter().any(|id| e.touches(id)));
            tracing::debug!(
                nodes = removed.len(),
                edges = before - self.edges.len(),
                "Removed nodes and their edges"
            );
        }
        removed
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) -> Vec<String> {
        changes::apply_edge_changes(changes, &mut self.edges)
    }

    /// Append an edge between two nodes; returns its id.
    ///
    /// Returns `None` only when the configured edge policy rejects the
    /// connection (repeated connection or self loop).
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Option<String> {
        let mut edge = Edge {
            id: String::new(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle,
            target_handle,
            selected: false,
        };

        if !self.policy.allow_self_loops && source == target {
            tracing::debug!(node_id = source, "Rejected self loop");
            return None;
        }
        if !self.policy.allow_duplicates && self.edges.iter().any(|e| e.same_connection(&edge)) {
            tracing::debug!(source, target, "Rejected duplicate edge");
            return None;
        }

        edge.id = self.edge_id_for(&edge);
        let id = edge.id.clone();
        self.edges.push(edge);
        Some(id)
    }

    fn edge_id_for(&self, edge: &Edge) -> String {
        let base = format!(
            "edge-{}{}-{}{}",
            edge.source,
            edge.source_handle.as_deref().unwrap_or(""),
            edge.target,
            edge.target_handle.as_deref().unwrap_or(""),
        );
        if !self.edges.iter().any(|e| e.id == base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.edges.iter().any(|e| e.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Overlay JSON keys onto a node's payload; false for unknown ids.
    pub fn update_node_data(&mut self, id: &str, patch: Value) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.data.merge_json(patch);
                true
            }
            None => false,
        }
    }

    pub fn update_frontmatter(&mut self, patch: FrontmatterPatch) -> bool {
        self.frontmatter.apply(patch)
    }

    /// Replace the whole triple (external document wins).
    pub fn replace(&mut self, document: FlowDocument) {
        self.frontmatter = document.flow;
        self.nodes = document.nodes;
        self.edges = document.edges;
    }

    pub fn clear(&mut self) {
        self.replace(FlowDocument::default());
    }

    /// Copy of the persisted triple
    pub fn snapshot(&self) -> FlowDocument {
        FlowDocument {
            flow: self.frontmatter.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}
