//! The download worker pool.
//!
//! Tasks go onto an unbounded queue shared by a fixed set of workers, so
//! enqueueing never blocks the producer. Each transfer is written to a
//! `.part` scratch file and atomically renamed into place once the byte
//! count checks out; an interrupted run leaves only the scratch file
//! behind and the next run redownloads it.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info, warn};

use pixm_runtime::retry::{with_retry, RetryPolicy};

use crate::animation::{animation_filename, AnimationPool};
use crate::error::{DownloadError, Result};
use crate::fetch::AssetFetcher;
use crate::task::DownloadTask;

/// Upper bound on concurrent download workers.
pub const MAX_WORKERS: usize = 32;

/// Resolution markers in frame archive URLs. High-resolution archives
/// are preferred but not published for every item.
const RES_HIGH: &str = "1920x1080";
const RES_LOW: &str = "600x600";

pub struct DownloadPool {
    tx: mpsc::UnboundedSender<DownloadTask>,
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
    animations: Arc<AnimationPool>,
}

impl DownloadPool {
    pub fn new(
        workers: usize,
        fetcher: Arc<dyn AssetFetcher>,
        animations: Arc<AnimationPool>,
    ) -> Self {
        Self::with_retry_policy(workers, fetcher, animations, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        workers: usize,
        fetcher: Arc<dyn AssetFetcher>,
        animations: Arc<AnimationPool>,
        retry: RetryPolicy,
    ) -> Self {
        let workers = workers.clamp(1, MAX_WORKERS);
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let pending = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(Notify::new());

        for worker in 0..workers {
            tokio::spawn(worker_loop(
                worker,
                Arc::clone(&rx),
                Arc::clone(&fetcher),
                Arc::clone(&animations),
                retry.clone(),
                Arc::clone(&pending),
                Arc::clone(&notify),
            ));
        }

        Self {
            tx,
            pending,
            notify,
            animations,
        }
    }

    /// Queue a task. Never blocks.
    pub fn enqueue(&self, task: DownloadTask) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(task).is_err()
            && self.pending.fetch_sub(1, Ordering::AcqRel) == 1
        {
            self.notify.notify_waiters();
        }
    }

    /// Tasks submitted but not yet completed.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until every queued download and animation rebuild is done.
    pub async fn drain(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
        self.animations.drain().await;
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DownloadTask>>>,
    fetcher: Arc<dyn AssetFetcher>,
    animations: Arc<AnimationPool>,
    retry: RetryPolicy,
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
) {
    loop {
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else { break };

        if let Err(e) = process(&*fetcher, &animations, &retry, &task).await {
            warn!(
                worker,
                item_id = task.item_id,
                url = %task.url,
                error = %e,
                "Download failed"
            );
        }

        if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            notify.notify_waiters();
        }
    }
}

async fn process(
    fetcher: &dyn AssetFetcher,
    animations: &Arc<AnimationPool>,
    retry: &RetryPolicy,
    task: &DownloadTask,
) -> Result<()> {
    let filename = task
        .target_filename()
        .ok_or_else(|| DownloadError::BadUrl(task.url.clone()))?;
    let dest_dir = task.dest_dir();
    let final_path = dest_dir.join(&filename);

    if fs::try_exists(&final_path).await? {
        debug!(path = %final_path.display(), "Already downloaded, skipping");
        return ensure_animation(animations, task, &final_path).await;
    }
    for alternate in task.alternate_dirs() {
        let alternate_path = alternate.join(&filename);
        if fs::try_exists(&alternate_path).await? {
            debug!(path = %alternate_path.display(), "Found under other layout, skipping");
            return ensure_animation(animations, task, &alternate_path).await;
        }
    }

    fs::create_dir_all(&dest_dir).await?;
    let scratch = dest_dir.join(format!("{filename}.part"));

    let result = with_retry(retry, DownloadError::is_recoverable, "Asset download", || {
        transfer(fetcher, &task.url, &scratch)
    })
    .await;

    // High-resolution frame archives are not always published; any
    // non-200 on a high-resolution URL falls back to the medium variant
    // once.
    match result {
        Err(DownloadError::Status { .. }) if task.url.contains(RES_HIGH) => {
            let fallback = task.url.replace(RES_HIGH, RES_LOW);
            info!(url = %fallback, "High-resolution archive missing, falling back");
            with_retry(retry, DownloadError::is_recoverable, "Asset download", || {
                transfer(fetcher, &fallback, &scratch)
            })
            .await?;
        }
        other => other?,
    }

    fs::rename(&scratch, &final_path).await?;
    debug!(path = %final_path.display(), "Downloaded");
    ensure_animation(animations, task, &final_path).await
}

/// Stream one URL into the scratch file and verify the byte count.
async fn transfer(fetcher: &dyn AssetFetcher, url: &str, scratch: &Path) -> Result<()> {
    let mut response = fetcher.fetch(url).await?;
    if response.status != 200 {
        return Err(DownloadError::Status {
            status: response.status,
            url: url.to_string(),
        });
    }

    let mut file = fs::File::create(scratch).await?;
    let written = tokio::io::copy(&mut response.reader, &mut file).await?;
    file.flush().await?;

    if let Some(expected) = response.content_length {
        if written != expected {
            return Err(DownloadError::LengthMismatch {
                expected,
                actual: written,
            });
        }
    }
    Ok(())
}

/// Queue a GIF rebuild if the task is animated and the GIF is missing.
async fn ensure_animation(
    animations: &Arc<AnimationPool>,
    task: &DownloadTask,
    archive: &Path,
) -> Result<()> {
    let Some(spec) = &task.animation else {
        return Ok(());
    };
    let gif = archive
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(animation_filename(spec.item_id));
    if fs::try_exists(&gif).await? {
        return Ok(());
    }
    animations.submit(archive.to_path_buf(), spec.item_id, spec.frame_delays_cs.clone());
    Ok(())
}
