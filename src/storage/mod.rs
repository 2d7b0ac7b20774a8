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


//! Durable storage
//!
//! SQLite via sqlx. The only table of interest is the download ledger.
//!
//! # Usage Example
//! ```no_run
//! use player_core::storage::{Database, DownloadLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new("./downloads.db").await?;
//! let ledger = DownloadLedger::new(db.pool().clone());
//!
//! ledger.put("https://host/video.mp4", "1b4e_video.mp4").await?;
//! assert!(ledger.get("https://host/video.mp4").await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod ledger;
pub mod migrations;

pub use database::Database;
pub use ledger::{DownloadLedger, LedgerEntry};
