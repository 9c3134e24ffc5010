//! Flow document - the on-disk TOML form of a flow and where it lives.

mod codec;
mod location;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{Edge, FlowFrontmatter, Node};

pub use codec::{parse, serialize};
pub use location::FlowLocation;

/// Frontmatter, nodes and edges as one serializable unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default)]
    pub flow: FlowFrontmatter,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowDocument {
    pub fn new(flow: FlowFrontmatter) -> Self {
        Self {
            flow,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to parse flow document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize flow document: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid flow name '{0}'")]
    InvalidFlowName(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a document's text; `None` when the file does not exist yet.
pub async fn read_text(path: &Path) -> Result<Option<String>, DocumentError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DocumentError::io(path, e)),
    }
}

/// Write a document's text, creating the flow directory if needed.
///
/// The text goes to a hidden sibling first and is renamed into place, so a
/// watcher never observes a half-written document.
pub async fn write_text(path: &Path, text: &str) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DocumentError::io(parent, e))?;
    }
    let staging = staging_path(path);
    tokio::fs::write(&staging, text)
        .await
        .map_err(|e| DocumentError::io(&staging, e))?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|e| DocumentError::io(path, e))
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
