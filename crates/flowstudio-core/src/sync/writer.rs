use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::document;

enum WriteRequest {
    Write { seq: u64, text: String },
    Flush(oneshot::Sender<()>),
}

/// Single writer for one document.
///
/// Writes run on one task in the order they were queued, so two quick
/// mutations can never land on disk out of order. Failures are logged and
/// dropped; nothing is retried.
pub struct DocumentWriter {
    path: PathBuf,
    tx: mpsc::UnboundedSender<WriteRequest>,
    written: watch::Receiver<u64>,
    next_seq: u64,
    task: JoinHandle<()>,
}

impl DocumentWriter {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (written_tx, written) = watch::channel(0);
        let task = tokio::spawn(write_loop(path.clone(), rx, written_tx));

        Self {
            path,
            tx,
            written,
            next_seq: 1,
            task,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a full-document write; returns its sequence number.
    pub fn enqueue(&mut self, text: String) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.tx.send(WriteRequest::Write { seq, text }).is_err() {
            tracing::warn!(path = %self.path.display(), seq, "Writer stopped; write dropped");
        }
        seq
    }

    /// Sequence number of the last queued write (0 before any)
    pub fn queued(&self) -> u64 {
        self.next_seq - 1
    }

    /// True while queued writes have not all completed
    pub fn is_behind(&self) -> bool {
        self.written() < self.queued()
    }

    /// Sequence number of the last completed write (0 before any)
    pub fn written(&self) -> u64 {
        *self.written.borrow()
    }

    /// Wait until every write queued so far has completed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteRequest::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Drain the queue and stop the task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(path = %self.path.display(), error = %e, "Writer task failed");
        }
    }
}

async fn write_loop(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
    written: watch::Sender<u64>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            WriteRequest::Write { seq, text } => {
                match document::write_text(&path, &text).await {
                    Ok(()) => {
                        tracing::debug!(
                            path = %path.display(),
                            seq,
                            bytes = text.len(),
                            "Wrote flow document"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            seq,
                            error = %e,
                            "Failed to write flow document"
                        );
                    }
                }
                written.send_replace(seq);
            }
            WriteRequest::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_land_in_queue_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows/ordered/flow.toml");
        let mut writer = DocumentWriter::spawn(path.clone());

        let mut last = 0;
        for i in 0..50 {
            last = writer.enqueue(format!("version = {}\n", i));
        }
        writer.flush().await;

        assert_eq!(last, 50);
        assert_eq!(writer.queued(), 50);
        assert_eq!(writer.written(), 50);
        assert!(!writer.is_behind());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version = 49\n");
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn failed_write_is_logged_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the flow directory should be makes every write fail.
        let blocker = dir.path().join("flows");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut writer = DocumentWriter::spawn(blocker.join("broken/flow.toml"));
        let seq = writer.enqueue("x = 1\n".to_string());
        writer.flush().await;

        assert_eq!(writer.written(), seq);
        assert!(blocker.is_file());
        writer.shutdown().await;
    }
}
