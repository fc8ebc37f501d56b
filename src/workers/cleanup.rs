use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Outcome of one deletion batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub already_missing: usize,
    pub failed: usize,
}

/// Deferred, fire-and-forget artifact deletion.
///
/// Every call arms one independent task on the runtime captured at
/// construction. Armed batches cannot be cancelled.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    runtime: Handle,
    pending: Arc<AtomicUsize>,
}

impl CleanupScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self {
            runtime: Handle::current(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Batches armed but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Deletes every path in `paths` once `delay` has elapsed.
    ///
    /// Duplicate paths are collapsed. The returned handle may be dropped;
    /// the batch runs to completion either way.
    pub fn schedule_deletion<I>(&self, paths: I, delay: Duration) -> JoinHandle<CleanupReport>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();

        info!(count = paths.len(), delay_secs = delay.as_secs_f64(), "Cleanup armed");

        self.pending.fetch_add(1, Ordering::SeqCst);
        let pending = self.pending.clone();

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let report = delete_batch(&paths).await;
            pending.fetch_sub(1, Ordering::SeqCst);
            info!(
                removed = report.removed,
                already_missing = report.already_missing,
                failed = report.failed,
                "Cleanup batch finished"
            );
            report
        })
    }
}

/// Deletes each path independently. A missing path counts as done.
pub async fn delete_batch(paths: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!(path = %path.display(), "Cleaned up file");
                report.removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.already_missing += 1;
            }
            Err(e) => {
                error!(path = %path.display(), "Error cleaning up file: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}
