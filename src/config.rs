// Player Core - Video download and playback core
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Core configuration
//!
//! Everything the download and playback core needs to know about its host:
//! where the application-private storage root is, how the ledger database is
//! named, and the knobs of the transfer engine.

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ledger database file name, relative to the storage root
pub const DEFAULT_DATABASE_FILE: &str = "downloads.db";

/// Default read/write buffer size for transfers (8KB chunks)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Application-private directory downloaded files are written to
    pub storage_root: PathBuf,

    /// Ledger database file name inside `storage_root`
    pub database_file: String,

    /// Maximum concurrent transfers
    pub max_concurrent_downloads: usize,

    /// Buffered writer capacity in bytes
    pub buffer_size: usize,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// User-Agent sent with every transfer
    pub user_agent: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("."),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            max_concurrent_downloads: 3,
            buffer_size: DEFAULT_BUFFER_SIZE,
            request_timeout_secs: 300,
            user_agent: format!("VideoPlayer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CoreConfig {
    /// Default configuration rooted at `storage_root`
    pub fn new<P: Into<PathBuf>>(storage_root: P) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PlayerError::FileIoError(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the supervisor and engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(PlayerError::InvalidConfiguration(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(PlayerError::InvalidConfiguration(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        if self.database_file.trim().is_empty() {
            return Err(PlayerError::InvalidConfiguration(
                "database_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the ledger database
    pub fn database_path(&self) -> PathBuf {
        self.storage_root.join(&self.database_file)
    }

    /// Full path of a downloaded file
    pub fn file_path(&self, target_name: &str) -> PathBuf {
        self.storage_root.join(target_name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::new("/data/app/files");
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.buffer_size, 8 * 1024);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/data/app/files/downloads.db")
        );
        assert_eq!(
            config.file_path("abc_video.mp4"),
            PathBuf::from("/data/app/files/abc_video.mp4")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage_root": "/tmp/videos", "buffer_size": 4096}"#).unwrap();

        let config = CoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/tmp/videos"));
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.database_file, DEFAULT_DATABASE_FILE);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = CoreConfig::default();
        config.max_concurrent_downloads = 0;
        assert!(matches!(
            config.validate(),
            Err(PlayerError::InvalidConfiguration(_))
        ));
    }
}
