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


//! Host notifications
//!
//! While a transfer runs, the host shows an ongoing indicator with the
//! current percent and a cancel action (an Android foreground notification,
//! a progress row in a desktop UI). The core only reports; the host renders
//! and calls `Supervisor::cancel` with the task id when the user cancels.

use serde::{Deserialize, Serialize};

/// Ongoing-operation indicator contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundInfo {
    /// Task to cancel when the user hits the cancel action
    pub task_id: String,
    /// Human-readable title (the target file name)
    pub title: String,
    /// Percent complete (0 - 100)
    pub percent: u8,
}

/// Receives lifecycle updates for running transfers
pub trait HostNotifier: Send + Sync {
    /// Transfer is in progress; called at start and on every percent step
    fn ongoing(&self, info: &ForegroundInfo);

    /// Transfer reached a terminal state; the indicator can be dismissed
    fn finished(&self, task_id: &str);
}

/// Discards all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl HostNotifier for NoopNotifier {
    fn ongoing(&self, _info: &ForegroundInfo) {}

    fn finished(&self, _task_id: &str) {}
}

/// Writes notifications to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl HostNotifier for TracingNotifier {
    fn ongoing(&self, info: &ForegroundInfo) {
        tracing::info!(task_id = %info.task_id, "{}: {}%", info.title, info.percent);
    }

    fn finished(&self, task_id: &str) {
        tracing::info!(task_id = %task_id, "transfer finished");
    }
}
