use std::path::{Path, PathBuf};

use super::DocumentError;
use crate::config::StudioConfig;

/// Where one flow's document lives:
/// `<documents-root>/<flows-dir>/<flow-name>/<document-name>`.
///
/// A location cannot be built without both the storage root and the flow
/// name, so nothing downstream can touch disk before both are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowLocation {
    flows_root: PathBuf,
    name: String,
    document_name: String,
}

impl FlowLocation {
    /// Location under `<documents_root>/flows/<name>/flow.toml`
    pub fn new(documents_root: &Path, name: &str) -> Result<Self, DocumentError> {
        Self::build(documents_root.join("flows"), name, "flow.toml")
    }

    pub fn from_config(config: &StudioConfig, name: &str) -> Result<Self, DocumentError> {
        Self::build(config.flows_root(), name, &config.document_name)
    }

    /// Location directly under an already resolved flows directory
    pub fn in_flows_root(
        flows_root: &Path,
        name: &str,
        document_name: &str,
    ) -> Result<Self, DocumentError> {
        Self::build(flows_root.to_path_buf(), name, document_name)
    }

    fn build(flows_root: PathBuf, name: &str, document_name: &str) -> Result<Self, DocumentError> {
        validate_flow_name(name)?;
        Ok(Self {
            flows_root,
            name: name.to_string(),
            document_name: document_name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flows_root(&self) -> &Path {
        &self.flows_root
    }

    pub fn flow_dir(&self) -> PathBuf {
        self.flows_root.join(&self.name)
    }

    pub fn document_path(&self) -> PathBuf {
        self.flow_dir().join(&self.document_name)
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Same root and document name, different flow
    pub fn sibling(&self, name: &str) -> Result<Self, DocumentError> {
        Self::build(self.flows_root.clone(), name, &self.document_name)
    }
}

pub(crate) fn validate_flow_name(name: &str) -> Result<(), DocumentError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\']);
    if invalid {
        return Err(DocumentError::InvalidFlowName(name.to_string()));
    }
    Ok(())
}
