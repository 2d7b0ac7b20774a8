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


//! Download requests and target file naming
//!
//! Every request gets a fresh file name `"{uuid}_{last path segment}"`, so two
//! downloads never write to the same file even when their URLs end in the
//! same segment.

use crate::error::{PlayerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Used when the URL has no usable last path segment
const FALLBACK_SEGMENT: &str = "download";

/// Filesystem component limit (bytes, UTF-8)
const MAX_COMPONENT_LENGTH: usize = 255;

lazy_static::lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).expect("valid filename regex");
}

/// One download to perform, consumed by [`Supervisor::submit`](super::Supervisor::submit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    source_url: String,
    target_name: String,
}

impl DownloadRequest {
    /// Build a request with a freshly generated target name
    pub fn new<S: Into<String>>(source_url: S) -> Result<Self> {
        let source_url = source_url.into();
        let target_name = generate_target_name(&source_url)?;
        Ok(Self {
            source_url,
            target_name,
        })
    }

    /// Build a request with a caller-chosen target name
    pub fn with_target_name<S: Into<String>, T: Into<String>>(
        source_url: S,
        target_name: T,
    ) -> Result<Self> {
        let source_url = source_url.into();
        parse_download_url(&source_url)?;

        let target_name = target_name.into();
        if target_name.is_empty() || sanitize_segment(&target_name) != target_name {
            return Err(PlayerError::invalid_url(format!(
                "not a plain file name: {:?}",
                target_name
            )));
        }

        Ok(Self {
            source_url,
            target_name,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }
}

/// Parse a source URL, accepting only http(s)
pub fn parse_download_url(source_url: &str) -> Result<Url> {
    let url = Url::parse(source_url.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PlayerError::invalid_url(format!(
            "unsupported scheme '{}' in {}",
            other, source_url
        ))),
    }
}

/// `"{uuid}_{last path segment}"` for `source_url`
pub fn generate_target_name(source_url: &str) -> Result<String> {
    let url = parse_download_url(source_url)?;
    let segment = last_path_segment(&url).unwrap_or_else(|| FALLBACK_SEGMENT.to_string());
    Ok(format!("{}_{}", Uuid::new_v4(), segment))
}

/// Last non-empty path segment, percent-decoded and made filesystem safe
fn last_path_segment(url: &Url) -> Option<String> {
    let raw = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let sanitized = sanitize_segment(&decoded);
    let trimmed = sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return None;
    }

    // uuid (36) + '_' must still fit in one path component
    Some(truncate_utf8(trimmed, MAX_COMPONENT_LENGTH - 37).to_string())
}

fn sanitize_segment(segment: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(segment, "_").into_owned()
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
