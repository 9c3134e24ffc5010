//! Sync - keeps an open flow and its document on disk converged.
//!
//! Outbound, every mutation re-serializes the whole flow and queues a write
//! on a single ordered writer. Inbound, a watch on the document triggers a
//! read-back; text matching what we last wrote is our own echo and is
//! ignored, anything else replaces the in-memory flow wholesale.

mod echo;
mod session;
mod watcher;
mod writer;

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;

pub use echo::EchoFilter;
pub use session::{FlowSession, SessionPhase, SyncOutcome};
pub use watcher::DocumentWatch;
pub use writer::DocumentWriter;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Flow '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
