use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Process-wide scratch directory shared by all executions. Every file in it
/// is owned by the execution that created it until that execution deletes it.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

impl Workspace {
    /// Creates the directory once at startup.
    pub fn init<T: AsRef<Path>>(root: T) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        tracing::info!(root = %root.display(), "Workspace initialized");
        Ok(Self { root })
    }

    /// Skips creating the directory; writes will fail if it cannot exist.
    #[cfg(test)]
    pub(crate) fn init_unchecked<T: AsRef<Path>>(root: T) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Idempotent; recreates the directory if something removed it.
    pub async fn ensure(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// `<prefix>_<unix millis>_<random suffix>`, unique across concurrent executions.
    pub fn unique_name(prefix: &str) -> String {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        format!(
            "{}_{}_{}",
            prefix,
            chrono::Utc::now().timestamp_millis(),
            suffix
        )
    }

    pub async fn write_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        self.ensure().await?;
        let path = self.root.join(name);
        fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Fresh per-execution subdirectory, for toolchains that dictate file names.
    pub async fn create_dir(&self, name: &str) -> std::io::Result<PathBuf> {
        self.ensure().await?;
        let path = self.root.join(name);
        fs::create_dir(&path).await?;
        Ok(path)
    }

    /// Best-effort deletion; failures are logged, never surfaced.
    pub async fn discard(&self, path: &Path) {
        let removal = match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
            Ok(_) => fs::remove_file(path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = removal {
            tracing::debug!(path = %path.display(), "Failed to discard: {}", e);
        }
    }

    /// Removes entries older than `max_age`. Entries may vanish concurrently;
    /// every listing, stat and removal failure is swallowed.
    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), "Failed to list workspace: {}", e);
                return report;
            }
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Failed to read workspace entry: {}", e);
                    report.failed += 1;
                    break;
                }
            };

            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            let path = entry.path();
            let removal = if meta.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match removal {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), "Failed to sweep: {}", e);
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 || report.failed > 0 {
            tracing::info!(
                removed = report.removed,
                failed = report.failed,
                "Workspace sweep finished"
            );
        }
        report
    }

    /// Starts the recurring sweep. It stops when the returned handle is shut
    /// down or dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, max_age: Duration) -> Sweeper {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let workspace = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        workspace.sweep(max_age).await;
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::debug!("Workspace sweeper stopped");
        });

        Sweeper {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
