//! # pixm Runtime
//!
//! Shared runtime infrastructure for the pixm workspace:
//! - JSON configuration loading/saving with defaults and validation
//! - `tracing`-based logging initialization
//! - The generic call-with-retry policy used by the API client and the
//!   downloader

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use retry::{with_retry, RetryPolicy};
