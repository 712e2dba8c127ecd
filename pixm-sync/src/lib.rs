//! # pixm sync
//!
//! Orchestrates a gallery synchronization run: listing pagination,
//! cataloging, download hand-off, local sequencing and author
//! enrichment.

pub mod error;
pub mod filter;
pub mod pipeline;
pub mod sink;

pub use error::{Result, SyncError};
pub use filter::ItemFilter;
pub use pipeline::{SyncPipeline, SyncReport, SyncRequest};
pub use sink::DownloadSink;
