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


//! Playback source resolution
//!
//! Decides what the player engine is handed for a source URL: the local
//! `file://` URI of a completed download, or the remote URL itself.
//! Only the ledger is consulted; the file system and network are not touched.

use crate::error::{PlayerError, Result};
use crate::storage::DownloadLedger;
use serde::Serialize;
use std::path::{Path, PathBuf};
use url::Url;

/// What the player engine should open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackSource {
    /// Not downloaded; stream the original URL
    Remote { uri: String },
    /// Completed download under the storage root
    Local { path: PathBuf, uri: String },
}

impl PlaybackSource {
    pub fn uri(&self) -> &str {
        match self {
            PlaybackSource::Remote { uri } => uri,
            PlaybackSource::Local { uri, .. } => uri,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, PlaybackSource::Local { .. })
    }
}

/// Resolves source URLs against the download ledger
#[derive(Debug, Clone)]
pub struct PlaybackResolver {
    ledger: DownloadLedger,
    storage_root: PathBuf,
}

impl PlaybackResolver {
    pub fn new<P: Into<PathBuf>>(ledger: DownloadLedger, storage_root: P) -> Self {
        Self {
            ledger,
            storage_root: storage_root.into(),
        }
    }

    /// Local URI if `source_url` was downloaded, otherwise the URL unchanged
    ///
    /// Malformed URLs are reported as [`PlayerError::InvalidUrl`].
    pub async fn resolve(&self, source_url: &str) -> Result<PlaybackSource> {
        if let Some(target_name) = self.ledger.get(source_url).await? {
            let path = self.storage_root.join(&target_name);
            let uri = local_file_uri(&self.storage_root, &target_name)?;
            return Ok(PlaybackSource::Local { path, uri });
        }

        Url::parse(source_url.trim())?;
        Ok(PlaybackSource::Remote {
            uri: source_url.to_string(),
        })
    }
}

/// `file://` URI of `target_name` inside `storage_root`
pub fn local_file_uri(storage_root: &Path, target_name: &str) -> Result<String> {
    let mut path = storage_root.join(target_name);
    if path.is_relative() {
        path = std::env::current_dir()?.join(path);
    }

    Url::from_file_path(&path)
        .map(|url| url.to_string())
        .map_err(|_| {
            PlayerError::invalid_url(format!("cannot build file URI for {}", path.display()))
        })
}
