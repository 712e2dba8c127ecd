//! Where the pipeline hands off asset downloads.

use pixm_download::{DownloadPool, DownloadTask};

/// Accepts download tasks without blocking. The pipeline only ever
/// submits; waiting for completion is the caller's concern.
pub trait DownloadSink: Send + Sync {
    fn submit(&self, task: DownloadTask);
}

impl DownloadSink for DownloadPool {
    fn submit(&self, task: DownloadTask) {
        self.enqueue(task);
    }
}
