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


//! Transfer progress tracking and reporting
//!
//! # Progress Information
//! - Whole-number percentage (0 - 100), never decreasing within a transfer
//! - Phase (Running, Succeeded, Failed)
//! - Error description once the transfer failed
//!
//! Percent steps are derived from `bytes * 100 / content_length` and only
//! reported when the value strictly increases, which bounds a transfer to at
//! most 101 progress notifications regardless of chunk size.

use serde::{Deserialize, Serialize};

/// Content lengths below this cannot produce meaningful percent steps;
/// such transfers only report their terminal status.
pub const MIN_PROGRESS_CONTENT_LENGTH: u64 = 100;

/// Lifecycle phase of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Transfer started, bytes may still arrive
    Running,
    /// File fully written and recorded in the ledger
    Succeeded,
    /// Transfer failed or was cancelled; partial file removed
    Failed,
}

/// Status snapshot for a single transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Percentage complete (0 - 100)
    pub percent: u8,

    /// Current phase of the transfer
    pub phase: TransferPhase,

    /// Optional error message if phase is Failed
    pub error_detail: Option<String>,
}

impl TransferStatus {
    /// Status emitted when a transfer starts
    pub fn started() -> Self {
        Self::running(0)
    }

    pub fn running(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
            phase: TransferPhase::Running,
            error_detail: None,
        }
    }

    pub fn succeeded() -> Self {
        Self {
            percent: 100,
            phase: TransferPhase::Succeeded,
            error_detail: None,
        }
    }

    /// Terminal failure, keeping the last percent that was reached
    pub fn failed<S: Into<String>>(percent: u8, reason: S) -> Self {
        Self {
            percent: percent.min(100),
            phase: TransferPhase::Failed,
            error_detail: Some(reason.into()),
        }
    }

    /// No further status follows a terminal one
    pub fn is_terminal(&self) -> bool {
        !matches!(self.phase, TransferPhase::Running)
    }

    /// Format status as display string
    pub fn display_string(&self, title: &str) -> String {
        match self.phase {
            TransferPhase::Running => format!("{}: {}%", title, self.percent),
            TransferPhase::Succeeded => format!("{}: Completed", title),
            TransferPhase::Failed => format!(
                "{}: Failed - {}",
                title,
                self.error_detail.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}

/// `floor(bytes * 100 / content_length)`, clamped to 100
///
/// `None` when the length is unknown or too small to yield percent steps.
pub fn percent_of(bytes: u64, content_length: Option<u64>) -> Option<u8> {
    let total = content_length.filter(|len| *len >= MIN_PROGRESS_CONTENT_LENGTH)?;
    let percent = (bytes as u128 * 100) / total as u128;
    Some(percent.min(100) as u8)
}

/// Progress tracker for one transfer
///
/// Accumulates written bytes and reports a new percent only when it is
/// strictly greater than the last reported one.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    content_length: Option<u64>,
    bytes_downloaded: u64,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            content_length,
            bytes_downloaded: 0,
            last_percent: 0,
        }
    }

    /// Account for `chunk_len` more bytes
    ///
    /// Returns the new percent if it advanced since the last report.
    pub fn advance(&mut self, chunk_len: u64) -> Option<u8> {
        self.bytes_downloaded = self.bytes_downloaded.saturating_add(chunk_len);

        let percent = percent_of(self.bytes_downloaded, self.content_length)?;
        if percent > self.last_percent {
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }
}
