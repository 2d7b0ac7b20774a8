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


//! Playback side of the core
//!
//! - `resolver` - local file URI for downloaded videos, remote URL otherwise
//! - `session` - per-screen state and user messages

pub mod resolver;
pub mod session;

pub use resolver::{local_file_uri, PlaybackResolver, PlaybackSource};
pub use session::{PlaybackRequest, PlayerEvent, PlayerSession, PlayerState, UserMessage};
