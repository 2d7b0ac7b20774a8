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


//! Error types for Player Core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by domain (network, file, database, input) so the
//! download supervisor can turn them into terminal status values and the
//! player session can turn them into user-facing messages.
//!
//! ## Categories
//!
//! ### Download/Network
//! - Non-success HTTP responses and connection failures → `NetworkError`
//! - Body shorter than the advertised length → `DownloadIncomplete`
//! - Cooperative cancellation → `Cancelled`
//!
//! ### File Operations
//! - Local write failures → `FileIoError`, `IoError`
//!
//! ### Input
//! - Source URLs that do not parse or use an unsupported scheme → `InvalidUrl`
//!
//! ### Database
//! - Ledger storage → `MigrationFailed`, `SqlxError`

use thiserror::Error;

/// Result type alias using our PlayerError type
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Main error type for Player Core
#[derive(Error, Debug)]
pub enum PlayerError {
    // ===== Download Errors =====

    /// Network connectivity error or non-success HTTP response
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        /// HTTP status code if the server answered
        status_code: Option<u16>,
    },

    /// Response body ended before the advertised content length
    #[error("Download incomplete: {actual}/{expected} bytes")]
    DownloadIncomplete {
        expected: u64,
        actual: u64,
    },

    /// Operation was cancelled by user or host
    #[error("Download cancelled")]
    Cancelled,

    // ===== Input Errors =====

    /// Source URL could not be parsed or is not usable
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // ===== File/Storage Errors =====

    /// Generic file I/O error with context
    #[error("File I/O error: {0}")]
    FileIoError(String),

    // ===== Database Errors =====

    /// Database schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    // ===== Configuration/State Errors =====

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<url::ParseError> for PlayerError {
    fn from(err: url::ParseError) -> Self {
        PlayerError::InvalidUrl(err.to_string())
    }
}

// Helper methods for creating common errors
impl PlayerError {
    /// Create a NetworkError
    pub fn network_error<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        PlayerError::NetworkError {
            message: message.into(),
            status_code,
        }
    }

    /// Create an InvalidUrl error with a message
    pub fn invalid_url<S: Into<String>>(message: S) -> Self {
        PlayerError::InvalidUrl(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        PlayerError::InternalError(message.into())
    }

    /// Check if error is related to local file/disk operations
    pub fn is_file_error(&self) -> bool {
        matches!(self, PlayerError::FileIoError(_) | PlayerError::IoError(_))
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::NetworkError { status_code: Some(404), .. } => {
                "The video could not be found on the server.".to_string()
            }
            PlayerError::NetworkError { message, .. } => {
                format!("Download failed: {}", message)
            }
            PlayerError::DownloadIncomplete { .. } => {
                "Download was interrupted. Please try again.".to_string()
            }
            PlayerError::InvalidUrl(message) => {
                format!("The video address is not valid: {}", message)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parse_error_is_invalid_url() {
        let err: PlayerError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, PlayerError::InvalidUrl(_)));
    }

    #[test]
    fn test_cancelled_message() {
        assert_eq!(PlayerError::Cancelled.to_string(), "Download cancelled");
    }

    #[test]
    fn test_categories() {
        let err = PlayerError::network_error("HTTP 404 Not Found", Some(404));
        assert!(!err.is_file_error());
        assert!(err.user_message().contains("could not be found"));

        let err = PlayerError::FileIoError("disk full".to_string());
        assert!(err.is_file_error());
    }
}
