//! Logging initialization built on `tracing-subscriber`.
//!
//! Supports pretty, JSON and compact output with an `EnvFilter`-style
//! module filter. Call [`init_logging`] once at startup.

use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors.
    Pretty,
    /// Structured JSON format for machine parsing.
    Json,
    /// Compact format for production.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Compact;
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Base level applied to the pixm crates ("trace" .. "error").
    pub level: String,
    /// Custom filter string overriding the default
    /// (e.g. "pixm_sync=trace,pixm_download=debug").
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = if let Some(custom) = &config.filter {
        custom.clone()
    } else {
        // Our crates at the configured level, noisy dependencies at warn.
        let level = &config.level;
        format!(
            "pixm_runtime={level},pixm_api={level},pixm_store={level},\
             pixm_download={level},pixm_sync={level},\
             hyper=warn,reqwest=warn,sqlx=warn"
        )
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {e}")))
}

/// Initialize the logging system. Returns an error if called twice.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let init_result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };

    init_result.map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}
