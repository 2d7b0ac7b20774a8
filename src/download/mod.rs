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


//! Download management and streaming
//!
//! This module fetches videos into the storage root so later playback can be
//! served from disk.
//!
//! - `request` - what to download and which local file name to use
//! - `transfer` - the HTTP engine (one GET, streamed to disk)
//! - `progress` - percent tracking and the status values subscribers see
//! - `supervisor` - background tasks, ledger pre-flight and finalization
//! - `notifier` - host-facing ongoing/finished notifications
//! - `registry` - latest status per task for polling hosts
//! - `cancel` - cooperative cancellation

pub mod cancel;
pub mod notifier;
pub mod progress;
pub mod registry;
pub mod request;
pub mod supervisor;
pub mod transfer;

// Re-export commonly used types
pub use cancel::CancelHandle;
pub use notifier::{ForegroundInfo, HostNotifier, NoopNotifier, TracingNotifier};
pub use progress::{TransferPhase, TransferStatus};
pub use registry::StatusRegistry;
pub use request::{generate_target_name, DownloadRequest};
pub use supervisor::{DownloadHandle, Submission, Supervisor};
pub use transfer::{FailureKind, TransferEngine, TransferFailure, TransferResult};
