//! Flowstudio Core - flow graph editing kernel
//!
//! This crate holds the in-memory graph of an open flow, keeps it in
//! sync with its `flow.toml` document on disk (in both directions), manages
//! the local catalog of flows, and drives schema-based node configuration
//! forms.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod document;
pub mod forms;
pub mod graph;
pub mod sync;

pub use catalog::FlowCatalog;
pub use config::StudioConfig;
pub use document::{FlowDocument, FlowLocation};
pub use graph::{Edge, FlowFrontmatter, GraphStore, Node, Position};
pub use sync::{FlowSession, SessionPhase, SyncOutcome};
