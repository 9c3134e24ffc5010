//! Graph state - nodes, edges and frontmatter of one open flow.

mod changes;
mod model;
mod store;

pub use changes::{apply_edge_changes, apply_node_changes, EdgeChange, NodeChange};
pub use model::{Edge, FlowFrontmatter, FrontmatterPatch, Node, NodeData, Position};
pub use store::{next_node_id, GraphStore};
