use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::SessionError;
use crate::config::WatchConfig;

/// Subscription to changes of one document file.
///
/// Watches the parent directory (editors often replace files by rename) and
/// forwards only events naming the document. Carries no payload beyond
/// "something changed". Dropping the subscription stops the watch.
pub struct DocumentWatch {
    path: PathBuf,
    watcher: Option<RecommendedWatcher>,
    rx: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
}

impl DocumentWatch {
    pub fn start(path: &Path, config: &WatchConfig) -> Result<Self, SessionError> {
        let watch_err = |source| SessionError::Watch {
            path: path.to_path_buf(),
            source,
        };
        let dir = path
            .parent()
            .ok_or_else(|| watch_err(notify::Error::generic("document has no parent directory")))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| watch_err(notify::Error::generic("document has no file name")))?
            .to_os_string();

        // The flow directory may not exist before the first write.
        std::fs::create_dir_all(dir).map_err(|e| watch_err(notify::Error::io(e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    // Reads show up as access events; reacting to them would
                    // loop on our own read-backs.
                    if ours && !event.kind.is_access() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Document watcher error"),
            },
            Config::default().with_poll_interval(config.poll_interval()),
        )
        .map_err(watch_err)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(watch_err)?;

        tracing::info!(path = %path.display(), "Watching flow document");

        Ok(Self {
            path: path.to_path_buf(),
            watcher: Some(watcher),
            rx,
            debounce: config.debounce(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// Wait for the next change. Notifications arriving within the debounce
    /// window collapse into one. `None` once stopped.
    pub async fn changed(&mut self) -> Option<()> {
        self.watcher.as_ref()?;
        self.rx.recv().await?;
        // Let the writer finish before the caller reads back.
        tokio::time::sleep(self.debounce).await;
        while self.rx.try_recv().is_ok() {}
        Some(())
    }

    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            self.rx.close();
            tracing::info!(path = %self.path.display(), "Stopped watching flow document");
        }
    }
}

impl Drop for DocumentWatch {
    fn drop(&mut self) {
        self.stop();
    }
}
