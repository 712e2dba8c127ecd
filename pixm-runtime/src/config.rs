//! JSON configuration for the archiver.
//!
//! The config file mirrors the layout users already know: a storage root
//! holding the database and downloaded works, plus per-subsystem sections.
//! Missing keys fall back to defaults, so an empty file (or no file at all)
//! yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Hard cap on downloader workers; mirrors the pool's own limit.
pub const MAX_DOWNLOAD_THREADS: usize = 32;

fn default_storage_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pixm")
}

fn default_threads() -> usize {
    5
}

fn default_language() -> String {
    "en".to_string()
}

/// Remote-API section: credentials and localization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PixivConfig {
    /// OAuth refresh token used for login and re-login.
    #[serde(default)]
    pub refresh_token: String,
    /// Accept-Language sent to the API; affects translated tag names.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for PixivConfig {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            language: default_language(),
        }
    }
}

/// Downloader section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloaderConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    /// Root directory for the database and downloaded works.
    /// Empty means `$HOME/.pixm`.
    #[serde(default)]
    pub storage_dir: PathBuf,

    /// Directory for downloaded works. Empty means `<storage_dir>/works`.
    #[serde(default)]
    pub works_dir: PathBuf,

    /// SQLite database file. Empty means `<storage_dir>/pixm.sqlite`.
    #[serde(default)]
    pub database_path: PathBuf,

    #[serde(default)]
    pub pixiv: PixivConfig,

    #[serde(default)]
    pub downloader: DownloaderConfig,
}

impl Config {
    /// Load configuration from `path`, filling absent keys with defaults.
    /// A missing file yields the default configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration back to `path` as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    /// Resolve empty paths to their derived defaults.
    pub fn apply_defaults(&mut self) {
        if self.storage_dir.as_os_str().is_empty() {
            self.storage_dir = default_storage_dir();
        }
        if self.works_dir.as_os_str().is_empty() {
            self.works_dir = self.storage_dir.join("works");
        }
        if self.database_path.as_os_str().is_empty() {
            self.database_path = self.storage_dir.join("pixm.sqlite");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.downloader.threads == 0 {
            return Err(Error::Config(
                "downloader.threads must be greater than 0".to_string(),
            ));
        }
        if self.downloader.threads > MAX_DOWNLOAD_THREADS {
            return Err(Error::Config(format!(
                "downloader.threads exceeds maximum of {MAX_DOWNLOAD_THREADS}"
            )));
        }
        Ok(())
    }

    /// Create the storage and works directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_dir)?;
        fs::create_dir_all(&self.works_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("config.json")).unwrap();

        assert_eq!(config.downloader.threads, 5);
        assert_eq!(config.pixiv.language, "en");
        assert_eq!(config.works_dir, config.storage_dir.join("works"));
        assert_eq!(config.database_path, config.storage_dir.join("pixm.sqlite"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"downloader": {"threads": 8}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.downloader.threads, 8);
        assert_eq!(config.pixiv.language, "en");
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.storage_dir = dir.path().join("store");
        config.pixiv.refresh_token = "token123".to_string();
        config.downloader.threads = 3;
        config.apply_defaults();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn rejects_zero_threads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"downloader": {"threads": 0}}"#).unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn rejects_excessive_threads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"downloader": {"threads": 64}}"#).unwrap();

        assert!(Config::load(&path).is_err());
    }
}
