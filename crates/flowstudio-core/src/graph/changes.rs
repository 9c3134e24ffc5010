//! Change batches - patch lists applied over the keyed node/edge collections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::model::{Edge, Node, Position};

/// A delta against the node collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeChange {
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        width: f64,
        height: f64,
    },
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
    Add {
        item: Node,
    },
    Replace {
        id: String,
        item: Node,
    },
}

/// A delta against the edge collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeChange {
    Select { id: String, selected: bool },
    Remove { id: String },
    Add { item: Edge },
    Replace { id: String, item: Edge },
}

/// Shape shared by both change kinds so one patch routine serves both.
trait KeyedChange<T> {
    /// Item appended by an `add` change
    fn added(&self) -> Option<&T>;
    /// Id the change targets (None for `add`)
    fn target(&self) -> Option<&str>;
    fn is_remove(&self) -> bool;
    /// Apply a non-remove, non-add change to the matching item
    fn update(&self, item: &mut T);
}

impl KeyedChange<Node> for NodeChange {
    fn added(&self) -> Option<&Node> {
        match self {
            Self::Add { item } => Some(item),
            _ => None,
        }
    }

    fn target(&self) -> Option<&str> {
        match self {
            Self::Position { id, .. }
            | Self::Dimensions { id, .. }
            | Self::Select { id, .. }
            | Self::Remove { id }
            | Self::Replace { id, .. } => Some(id),
            Self::Add { .. } => None,
        }
    }

    fn is_remove(&self) -> bool {
        matches!(self, Self::Remove { .. })
    }

    fn update(&self, node: &mut Node) {
        match self {
            Self::Position {
                position, dragging, ..
            } => {
                if let Some(position) = position {
                    node.position = *position;
                }
                if let Some(dragging) = dragging {
                    node.dragging = *dragging;
                }
            }
            Self::Dimensions { width, height, .. } => {
                node.width = Some(*width);
                node.height = Some(*height);
            }
            Self::Select { selected, .. } => node.selected = *selected,
            Self::Replace { item, .. } => *node = item.clone(),
            Self::Remove { .. } | Self::Add { .. } => {}
        }
    }
}

impl KeyedChange<Edge> for EdgeChange {
    fn added(&self) -> Option<&Edge> {
        match self {
            Self::Add { item } => Some(item),
            _ => None,
        }
    }

    fn target(&self) -> Option<&str> {
        match self {
            Self::Select { id, .. } | Self::Remove { id } | Self::Replace { id, .. } => Some(id),
            Self::Add { .. } => None,
        }
    }

    fn is_remove(&self) -> bool {
        matches!(self, Self::Remove { .. })
    }

    fn update(&self, edge: &mut Edge) {
        match self {
            Self::Select { selected, .. } => edge.selected = *selected,
            Self::Replace { item, .. } => *edge = item.clone(),
            Self::Remove { .. } | Self::Add { .. } => {}
        }
    }
}

/// Match changes to items by id; removals drop the item, everything else is
/// applied in batch order. Unknown ids are ignored, and so are adds whose id
/// is already taken. Returns removed ids.
fn apply_keyed<T, C>(
    changes: &[C],
    items: &mut Vec<T>,
    key: impl Fn(&T) -> &str,
) -> Vec<String>
where
    T: Clone,
    C: KeyedChange<T>,
{
    let mut by_id: HashMap<&str, Vec<&C>> = HashMap::new();
    for change in changes {
        if let Some(id) = change.target() {
            by_id.entry(id).or_default().push(change);
        }
    }

    let mut removed = Vec::new();
    let mut next = Vec::with_capacity(items.len());
    for mut item in items.drain(..) {
        match by_id.get(key(&item)) {
            Some(pending) if pending.iter().any(|c| c.is_remove()) => {
                removed.push(key(&item).to_string());
            }
            Some(pending) => {
                for change in pending {
                    change.update(&mut item);
                }
                next.push(item);
            }
            None => next.push(item),
        }
    }

    for added in changes.iter().filter_map(|c| c.added()) {
        if next.iter().any(|existing| key(existing) == key(added)) {
            tracing::debug!(id = key(added), "Ignoring add for an existing id");
            continue;
        }
        next.push(added.clone());
    }
    *items = next;
    removed
}

/// Apply a batch of node changes; returns the ids of removed nodes.
pub fn apply_node_changes(changes: &[NodeChange], nodes: &mut Vec<Node>) -> Vec<String> {
    apply_keyed(changes, nodes, |n| n.id.as_str())
}

/// Apply a batch of edge changes; returns the ids of removed edges.
pub fn apply_edge_changes(changes: &[EdgeChange], edges: &mut Vec<Edge>) -> Vec<String> {
    apply_keyed(changes, edges, |e| e.id.as_str())
}
