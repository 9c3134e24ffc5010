//! Flow session - one open flow, its graph, and its document.

use serde_json::Value;

use super::{DocumentWatch, DocumentWriter, EchoFilter, SessionError};
use crate::config::{StudioConfig, WatchConfig};
use crate::document::{self, FlowDocument, FlowLocation};
use crate::graph::{
    EdgeChange, FlowFrontmatter, FrontmatterPatch, GraphStore, NodeChange, Position,
};

/// Lifecycle of an open flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unloaded,
    Loading,
    Loaded { watching: bool },
}

/// What an inbound read did to the in-memory flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// External content replaced the flow
    Applied,
    /// Content matched our own serialization; nothing changed
    Unchanged,
    /// Read or parse failed; nothing changed
    Rejected,
}

/// An open flow kept in sync with its `flow.toml`.
///
/// Local mutations are written through immediately. External changes
/// replace local state wholesale unless they are our own echo. Read, parse
/// and write failures are logged and leave the in-memory flow as it was.
pub struct FlowSession {
    location: FlowLocation,
    watch_config: WatchConfig,
    store: GraphStore,
    phase: SessionPhase,
    echo: EchoFilter,
    writer: Option<DocumentWriter>,
    watch: Option<DocumentWatch>,
}

impl FlowSession {
    pub fn new(location: FlowLocation, config: &StudioConfig) -> Self {
        Self {
            location,
            watch_config: config.watch.clone(),
            store: GraphStore::new(config.edges),
            phase: SessionPhase::Unloaded,
            echo: EchoFilter::default(),
            writer: None,
            watch: None,
        }
    }

    /// Load the document and start watching it.
    pub async fn open(location: FlowLocation, config: &StudioConfig) -> Result<Self, SessionError> {
        let mut session = Self::new(location, config);
        session.load().await?;
        session.watch()?;
        Ok(session)
    }

    pub fn location(&self) -> &FlowLocation {
        &self.location
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.phase, SessionPhase::Loaded { .. })
    }

    pub fn graph(&self) -> &GraphStore {
        &self.store
    }

    /// Last known serialization of the flow
    pub fn document_text(&self) -> &str {
        self.echo.last()
    }

    /// Initial read. A missing document is an empty flow.
    ///
    /// On failure the session falls back to `Unloaded` so the load can be
    /// retried; no writes happen and no watch is registered until it succeeds.
    pub async fn load(&mut self) -> Result<(), SessionError> {
        if self.is_loaded() {
            return Ok(());
        }
        self.phase = SessionPhase::Loading;
        let path = self.location.document_path();
        tracing::info!(flow = %self.location.name(), path = %path.display(), "Loading flow");

        let loaded = match document::read_text(&path).await {
            Ok(Some(text)) => document::parse(&text).map(|doc| Some((text, doc))),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(Some((text, doc))) => {
                tracing::info!(
                    flow = %self.location.name(),
                    nodes = doc.nodes.len(),
                    edges = doc.edges.len(),
                    "Loaded flow"
                );
                self.store.replace(doc);
                self.echo.reset(text);
            }
            Ok(None) => {
                tracing::info!(flow = %self.location.name(), "No document yet, starting empty");
                self.store
                    .replace(FlowDocument::new(FlowFrontmatter::named(self.location.name())));
                self.echo.reset(String::new());
            }
            Err(e) => {
                tracing::warn!(flow = %self.location.name(), error = %e, "Failed to load flow");
                self.phase = SessionPhase::Unloaded;
                return Err(e.into());
            }
        }

        self.writer = Some(DocumentWriter::spawn(path));
        self.phase = SessionPhase::Loaded { watching: false };
        Ok(())
    }

    /// Register the watch subscription. Only valid once loaded.
    pub fn watch(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Loaded { watching: true } => Ok(()),
            SessionPhase::Loaded { watching: false } => {
                let watch =
                    DocumentWatch::start(&self.location.document_path(), &self.watch_config)?;
                self.watch = Some(watch);
                self.phase = SessionPhase::Loaded { watching: true };
                Ok(())
            }
            SessionPhase::Unloaded | SessionPhase::Loading => {
                Err(SessionError::NotLoaded(self.location.name().to_string()))
            }
        }
    }

    /// Wait for the watched document to change. `None` when not watching.
    pub async fn next_change(&mut self) -> Option<()> {
        match self.watch.as_mut() {
            Some(watch) => watch.changed().await,
            None => None,
        }
    }

    /// Wait for the next change and reconcile with it.
    pub async fn follow(&mut self) -> Option<SyncOutcome> {
        self.next_change().await?;
        Some(self.sync_from_disk().await)
    }

    /// Read the document back and reconcile.
    ///
    /// A document that has disappeared empties the flow.
    pub async fn sync_from_disk(&mut self) -> SyncOutcome {
        if !self.is_loaded() {
            return SyncOutcome::Rejected;
        }
        let path = self.location.document_path();
        match document::read_text(&path).await {
            Ok(Some(text)) => self.apply_external(&text),
            Ok(None) => {
                if self.echo.last().is_empty() && self.store.is_empty() {
                    return SyncOutcome::Unchanged;
                }
                tracing::info!(
                    flow = %self.location.name(),
                    "Flow document removed, clearing flow"
                );
                let flow = self.store.frontmatter().clone();
                self.store.replace(FlowDocument::new(flow));
                self.echo.reset(String::new());
                SyncOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(
                    flow = %self.location.name(),
                    error = %e,
                    "Failed to read flow document"
                );
                SyncOutcome::Rejected
            }
        }
    }

    /// Reconcile with externally supplied document text.
    pub fn apply_external(&mut self, text: &str) -> SyncOutcome {
        let written = self.writer.as_ref().map(|w| w.written()).unwrap_or(0);
        if self.echo.is_echo(text, written) {
            tracing::debug!(flow = %self.location.name(), "Ignoring our own write");
            return SyncOutcome::Unchanged;
        }

        match document::parse(text) {
            Ok(doc) => {
                tracing::info!(
                    flow = %self.location.name(),
                    nodes = doc.nodes.len(),
                    edges = doc.edges.len(),
                    "Applied external flow change"
                );
                self.store.replace(doc);
                match self.writer.as_mut().filter(|w| w.is_behind()) {
                    // Queued local writes would land over the external text;
                    // write it again behind them so the disk ends on it.
                    Some(writer) => {
                        let seq = writer.enqueue(text.to_string());
                        self.echo.record_outbound(seq, text.to_string());
                    }
                    None => self.echo.reset(text),
                }
                SyncOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(
                    flow = %self.location.name(),
                    error = %e,
                    "Ignoring unparsable flow document"
                );
                SyncOutcome::Rejected
            }
        }
    }

    pub fn add_node(&mut self, node_type: &str, position: Position, payload: Value) -> String {
        let id = self.store.add_node(node_type, position, payload);
        self.persist();
        id
    }

    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> Vec<String> {
        let removed = self.store.apply_node_changes(changes);
        self.persist();
        removed
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) -> Vec<String> {
        let removed = self.store.apply_edge_changes(changes);
        self.persist();
        removed
    }

    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Option<String> {
        let id = self
            .store
            .connect(source, target, source_handle, target_handle)?;
        self.persist();
        Some(id)
    }

    pub fn update_node_data(&mut self, id: &str, patch: Value) -> bool {
        let updated = self.store.update_node_data(id, patch);
        if updated {
            self.persist();
        }
        updated
    }

    pub fn update_frontmatter(&mut self, patch: FrontmatterPatch) -> bool {
        let changed = self.store.update_frontmatter(patch);
        if changed {
            self.persist();
        }
        changed
    }

    /// Serialize the whole flow and queue it for writing.
    fn persist(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            tracing::debug!(flow = %self.location.name(), "Flow not loaded yet, skipping write");
            return;
        };
        match document::serialize(&self.store.snapshot()) {
            Ok(text) => {
                let seq = writer.enqueue(text.clone());
                self.echo.record_outbound(seq, text);
            }
            Err(e) => {
                tracing::warn!(
                    flow = %self.location.name(),
                    error = %e,
                    "Failed to serialize flow"
                );
            }
        }
    }

    /// Wait for queued writes to land.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// Stop watching and drain pending writes.
    pub async fn close(mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.stop();
        }
        if let Some(writer) = self.writer.take() {
            writer.shutdown().await;
        }
        tracing::info!(flow = %self.location.name(), "Closed flow");
    }
}
