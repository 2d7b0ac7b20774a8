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


//! HTTP transfer engine
//!
//! One whole-file GET per run, streamed chunk by chunk into a buffered
//! writer. Never resumes and never retries.
//!
//! # Guarantees
//! - The destination file is only created after a success status.
//! - Every failure (HTTP status, connection, stream, disk, cancellation)
//!   removes the partial destination file before the result is returned.
//! - `Success` is only returned after the writer is flushed and the file is
//!   synced, so callers may record the file as complete.

use crate::config::CoreConfig;
use crate::download::cancel::CancelSignal;
use crate::download::progress::ProgressTracker;
use crate::error::{PlayerError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Why a transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP status, connection or stream failure
    Network,
    /// Local filesystem failure
    Io,
    /// Cooperative cancellation
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl TransferFailure {
    pub fn from_error(error: &PlayerError) -> Self {
        let kind = match error {
            PlayerError::Cancelled => FailureKind::Cancelled,
            e if e.is_file_error() => FailureKind::Io,
            _ => FailureKind::Network,
        };
        Self {
            kind,
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Outcome of one [`TransferEngine::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    Success { bytes: u64 },
    Failure(TransferFailure),
}

/// Streams a remote resource into a local file
#[derive(Debug, Clone)]
pub struct TransferEngine {
    client: Client,
    buffer_size: usize,
}

impl TransferEngine {
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self::with_client(client, config.buffer_size))
    }

    pub fn with_client(client: Client, buffer_size: usize) -> Self {
        Self {
            client,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Download `source_url` into `destination`
    ///
    /// `on_progress` receives each strictly increasing percent step. It is not
    /// called when the content length is unknown or too small.
    pub async fn run<F>(
        &self,
        source_url: &str,
        destination: &Path,
        cancel: &mut CancelSignal,
        mut on_progress: F,
    ) -> TransferResult
    where
        F: FnMut(u8) + Send,
    {
        match self
            .download_to_file(source_url, destination, cancel, &mut on_progress)
            .await
        {
            Ok(bytes) => {
                tracing::debug!("Transfer of {} complete ({} bytes)", source_url, bytes);
                TransferResult::Success { bytes }
            }
            Err(e) => {
                remove_partial_file(destination).await;
                tracing::warn!("Transfer of {} failed: {}", source_url, e);
                TransferResult::Failure(TransferFailure::from_error(&e))
            }
        }
    }

    async fn download_to_file<F>(
        &self,
        source_url: &str,
        destination: &Path,
        cancel: &mut CancelSignal,
        on_progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(u8) + Send,
    {
        if cancel.is_cancelled() {
            return Err(PlayerError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlayerError::Cancelled),
            response = self.client.get(source_url).send() => response.map_err(|e| {
                PlayerError::network_error(format!("Request failed: {}", e), None)
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PlayerError::network_error(
                format!("HTTP {}", status),
                Some(status.as_u16()),
            ));
        }

        let content_length = response.content_length();
        let mut tracker = ProgressTracker::new(content_length);

        let file = File::create(destination).await.map_err(|e| {
            PlayerError::FileIoError(format!(
                "Failed to create {}: {}",
                destination.display(),
                e
            ))
        })?;
        let mut writer = BufWriter::with_capacity(self.buffer_size, file);

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PlayerError::Cancelled),
                next = stream.next() => next,
            };

            let Some(chunk_result) = next else {
                break;
            };
            let chunk = chunk_result
                .map_err(|e| PlayerError::network_error(format!("Stream error: {}", e), None))?;

            writer.write_all(&chunk).await?;

            if let Some(percent) = tracker.advance(chunk.len() as u64) {
                on_progress(percent);
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        let bytes = tracker.bytes_downloaded();
        if let Some(expected) = content_length {
            if bytes < expected {
                return Err(PlayerError::DownloadIncomplete {
                    expected,
                    actual: bytes,
                });
            }
        }

        Ok(bytes)
    }
}

async fn remove_partial_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial file {}: {}", path.display(), e),
    }
}
