//! Animation reconstruction: frame archive (ZIP) to animated GIF.
//!
//! Decoding and encoding are CPU-bound, so jobs run on the blocking
//! thread pool behind a semaphore sized to the machine, keeping one core
//! free for the async runtime.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, warn};

use crate::error::{DownloadError, Result};

/// Fallback per-frame delay when metadata is short, in hundredths of a
/// second.
const DEFAULT_FRAME_DELAY_CS: u32 = 10;

/// Output filename next to the archive.
pub fn animation_filename(item_id: i64) -> String {
    format!("{item_id}_anim.gif")
}

/// Bounded pool of animation rebuild jobs.
pub struct AnimationPool {
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl AnimationPool {
    /// Sized to `available_parallelism - 1`, at least one.
    pub fn new() -> Self {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self::with_parallelism(cores.saturating_sub(1).max(1))
    }

    pub fn with_parallelism(jobs: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(jobs.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Queue a rebuild of `archive` into `<item_id>_anim.gif` in the same
    /// directory. Returns immediately; failures are logged and dropped.
    pub fn submit(self: &Arc<Self>, archive: PathBuf, item_id: i64, frame_delays_cs: Vec<u32>) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = pool.semaphore.acquire().await.ok();
            let result = tokio::task::spawn_blocking(move || {
                rebuild_animation(&archive, item_id, &frame_delays_cs)
            })
            .await;

            match result {
                Ok(Ok(path)) => debug!(item_id, path = %path.display(), "Animation rebuilt"),
                Ok(Err(e)) => warn!(item_id, error = %e, "Animation rebuild failed"),
                Err(e) => error!(item_id, error = %e, "Animation rebuild panicked"),
            }

            if pool.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                pool.notify.notify_waiters();
            }
        });
    }

    /// Wait until all queued rebuilds have finished.
    pub async fn drain(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for AnimationPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode every frame of the archive in listing order and encode them as
/// a looping GIF next to it. Writes to a scratch file first so an
/// interrupted rebuild never leaves a half-written GIF behind.
pub fn rebuild_animation(archive: &Path, item_id: i64, frame_delays_cs: &[u32]) -> Result<PathBuf> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DownloadError::CorruptArchive(e.to_string()))?;

    let mut names: Vec<String> = zip.file_names().map(str::to_owned).collect();
    names.sort();
    if names.is_empty() {
        return Err(DownloadError::CorruptArchive(format!(
            "{} has no entries",
            archive.display()
        )));
    }

    let out_path = archive
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(animation_filename(item_id));
    let scratch = out_path.with_extension("gif.part");

    {
        let out = std::fs::File::create(&scratch)?;
        let mut encoder = GifEncoder::new(out);
        encoder.set_repeat(Repeat::Infinite)?;

        for (index, name) in names.iter().enumerate() {
            let mut entry = zip
                .by_name(name)
                .map_err(|e| DownloadError::CorruptArchive(e.to_string()))?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;

            let frame = image::load_from_memory(&bytes)?.to_rgba8();
            let delay_cs = frame_delays_cs
                .get(index)
                .copied()
                .unwrap_or(DEFAULT_FRAME_DELAY_CS);
            encoder.encode_frame(Frame::from_parts(
                frame,
                0,
                0,
                Delay::from_numer_denom_ms(delay_cs * 10, 1),
            ))?;
        }
    }

    std::fs::rename(&scratch, &out_path)?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, RgbaImage};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_archive(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("77_ugoira1920x1080.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for i in 0..frames {
            let mut png = Vec::new();
            let image = RgbaImage::from_pixel(4, 4, image::Rgba([i as u8 * 40, 0, 0, 255]));
            image
                .write_to(
                    &mut std::io::Cursor::new(&mut png),
                    image::ImageFormat::Png,
                )
                .unwrap();
            writer
                .start_file(format!("{i:06}.jpg"), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&png).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn rebuilds_gif_with_all_frames() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), 3);

        let out = rebuild_animation(&archive, 77, &[7, 13, 7]).unwrap();
        assert_eq!(out, dir.path().join("77_anim.gif"));
        assert!(!dir.path().join("77_anim.gif.part").exists());

        let decoder = GifDecoder::new(std::io::BufReader::new(
            std::fs::File::open(&out).unwrap(),
        ))
        .unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn short_delay_list_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), 2);
        assert!(rebuild_animation(&archive, 77, &[7]).is_ok());
    }

    #[test]
    fn garbage_archive_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("77.zip");
        std::fs::write(&path, b"not a zip").unwrap();

        let err = rebuild_animation(&path, 77, &[]).unwrap_err();
        assert!(matches!(err, DownloadError::CorruptArchive(_)));
        assert!(err.is_recoverable());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pool_drain_waits_for_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), 2);

        let pool = Arc::new(AnimationPool::with_parallelism(1));
        pool.submit(archive, 77, vec![7, 7]);
        pool.drain().await;

        assert!(dir.path().join("77_anim.gif").exists());
    }
}
