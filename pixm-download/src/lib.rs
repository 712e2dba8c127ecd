//! # pixm download engine
//!
//! A fixed-size worker pool that streams gallery assets to disk with
//! retry, resume-safe atomic writes and duplicate detection, plus a
//! CPU-bounded pool that rebuilds animations from their frame archives.

pub mod animation;
pub mod error;
pub mod fetch;
pub mod pool;
pub mod task;

pub use animation::{animation_filename, rebuild_animation, AnimationPool};
pub use error::{DownloadError, Result};
pub use fetch::{AssetFetcher, AssetResponse, ReqwestAssetFetcher};
pub use pool::{DownloadPool, MAX_WORKERS};
pub use task::{filename_from_url, AnimationSpec, DownloadTask};
