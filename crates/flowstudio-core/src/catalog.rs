//! Flow catalog - the flows stored under `<documents-root>/flows`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::StudioConfig;
use crate::document::{self, DocumentError, FlowDocument, FlowLocation};
use crate::graph::{FlowFrontmatter, FrontmatterPatch};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Flow '{0}' already exists")]
    AlreadyExists(String),

    #[error("Flow '{0}' not found")]
    NotFound(String),
}

/// Summary of one stored flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEntry {
    pub name: String,
    pub path: PathBuf,
    /// Frontmatter, when the document exists and parses
    pub flow: Option<FlowFrontmatter>,
    pub nodes: usize,
    pub edges: usize,
}

/// Local create/list/rename/delete of flows.
pub struct FlowCatalog {
    flows_root: PathBuf,
    document_name: String,
}

impl FlowCatalog {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            flows_root: config.flows_root(),
            document_name: config.document_name.clone(),
        }
    }

    pub fn flows_root(&self) -> &Path {
        &self.flows_root
    }

    /// Location of a flow in this catalog (the flow need not exist)
    pub fn location(&self, name: &str) -> Result<FlowLocation, CatalogError> {
        Ok(FlowLocation::in_flows_root(
            &self.flows_root,
            name,
            &self.document_name,
        )?)
    }

    /// All flows, sorted by name.
    ///
    /// Directories without a document (left behind by watching a flow that
    /// was never written) are not flows.
    pub async fn list(&self) -> Result<Vec<FlowEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.flows_root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(DocumentError::io(&self.flows_root, e).into()),
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DocumentError::io(&self.flows_root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_dir || name.starts_with('.') {
                continue;
            }
            let Ok(location) = self.location(&name) else {
                continue;
            };
            if let Some(entry) = self.describe(location).await {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn describe(&self, location: FlowLocation) -> Option<FlowEntry> {
        let path = location.document_path();
        let parsed = match document::read_text(&path).await {
            Ok(Some(text)) => match document::parse(&text) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!(flow = %location.name(), error = %e, "Unparsable flow document");
                    None
                }
            },
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(flow = %location.name(), error = %e, "Unreadable flow document");
                None
            }
        };

        Some(FlowEntry {
            name: location.name().to_string(),
            path,
            nodes: parsed.as_ref().map(|d| d.nodes.len()).unwrap_or(0),
            edges: parsed.as_ref().map(|d| d.edges.len()).unwrap_or(0),
            flow: parsed.map(|d| d.flow),
        })
    }

    /// Create a flow with fresh frontmatter and an empty graph.
    ///
    /// An existing directory without a document is reused.
    pub async fn create(&self, name: &str) -> Result<FlowLocation, CatalogError> {
        let location = self.location(name)?;
        if tokio::fs::try_exists(location.document_path())
            .await
            .unwrap_or(false)
        {
            return Err(CatalogError::AlreadyExists(name.to_string()));
        }

        let text = document::serialize(&FlowDocument::new(FlowFrontmatter::named(name)))?;
        document::write_text(&location.document_path(), &text).await?;
        tracing::info!(flow = name, "Created flow");
        Ok(location)
    }

    /// Rename a flow directory and the name in its frontmatter.
    pub async fn rename(&self, from: &str, to: &str) -> Result<FlowLocation, CatalogError> {
        let source = self.location(from)?;
        let target = self.location(to)?;
        if !self.exists(&source).await {
            return Err(CatalogError::NotFound(from.to_string()));
        }
        if self.exists(&target).await {
            return Err(CatalogError::AlreadyExists(to.to_string()));
        }

        tokio::fs::rename(source.flow_dir(), target.flow_dir())
            .await
            .map_err(|e| DocumentError::io(&source.flow_dir(), e))?;

        let path = target.document_path();
        if let Some(text) = document::read_text(&path).await? {
            let mut doc = document::parse(&text)?;
            doc.flow.apply(FrontmatterPatch {
                name: Some(to.to_string()),
                ..FrontmatterPatch::default()
            });
            document::write_text(&path, &document::serialize(&doc)?).await?;
        }

        tracing::info!(from, to, "Renamed flow");
        Ok(target)
    }

    pub async fn delete(&self, name: &str) -> Result<(), CatalogError> {
        let location = self.location(name)?;
        if !self.exists(&location).await {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        tokio::fs::remove_dir_all(location.flow_dir())
            .await
            .map_err(|e| DocumentError::io(&location.flow_dir(), e))?;
        tracing::info!(flow = name, "Deleted flow");
        Ok(())
    }

    async fn exists(&self, location: &FlowLocation) -> bool {
        tokio::fs::try_exists(location.flow_dir())
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(root: &Path) -> FlowCatalog {
        let mut config = StudioConfig::default();
        config.documents_root = root.to_path_buf();
        FlowCatalog::new(&config)
    }

    #[tokio::test]
    async fn create_list_rename_delete() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());

        assert!(catalog.list().await.unwrap().is_empty());

        catalog.create("billing").await.unwrap();
        catalog.create("alerts").await.unwrap();
        assert!(matches!(
            catalog.create("billing").await,
            Err(CatalogError::AlreadyExists(_))
        ));

        let names: Vec<String> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["alerts", "billing"]);

        let renamed = catalog.rename("billing", "invoices").await.unwrap();
        let text = std::fs::read_to_string(renamed.document_path()).unwrap();
        let doc = document::parse(&text).unwrap();
        assert_eq!(doc.flow.name, "invoices");
        assert_eq!(doc.flow.version, "0.0.1");

        catalog.delete("alerts").await.unwrap();
        assert!(matches!(
            catalog.delete("alerts").await,
            Err(CatalogError::NotFound(_))
        ));

        let entries = catalog.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "invoices");
        assert_eq!(entries[0].flow.as_ref().map(|f| f.active), Some(false));
    }

    #[tokio::test]
    async fn rejects_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        assert!(matches!(
            catalog.create("../escape").await,
            Err(CatalogError::Document(DocumentError::InvalidFlowName(_)))
        ));
    }
}
