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


//! Download ledger
//!
//! Durable mapping from a source URL to the name of the file it was
//! downloaded to, relative to the storage root. A row is only ever written
//! after the file has been completely flushed to disk, so presence of a key
//! means the local copy is complete.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// One completed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub source_url: String,
    pub target_name: String,
    /// RFC 3339 timestamp of the write
    pub recorded_at: String,
}

/// Key/value view over the `DownloadLedger` table
#[derive(Debug, Clone)]
pub struct DownloadLedger {
    pool: SqlitePool,
}

impl DownloadLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up the local file name for `source_url`
    ///
    /// An absent key is `Ok(None)`, not an error.
    pub async fn get(&self, source_url: &str) -> Result<Option<String>> {
        let target_name: Option<String> =
            sqlx::query_scalar("SELECT target_name FROM DownloadLedger WHERE source_url = ?")
                .bind(source_url)
                .fetch_optional(&self.pool)
                .await?;

        Ok(target_name)
    }

    /// Record `source_url -> target_name`; an existing entry is overwritten
    pub async fn put(&self, source_url: &str, target_name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO DownloadLedger (source_url, target_name, recorded_at)
            VALUES (?, ?, ?)
            ON CONFLICT(source_url) DO UPDATE SET
                target_name = excluded.target_name,
                recorded_at = excluded.recorded_at
            "#,
        )
        .bind(source_url)
        .bind(target_name)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!("Ledger: {} -> {}", source_url, target_name);
        Ok(())
    }

    /// Whether `source_url` has a completed download
    pub async fn contains(&self, source_url: &str) -> Result<bool> {
        Ok(self.get(source_url).await?.is_some())
    }

    /// Drop one entry. Returns true if a row was removed.
    pub async fn remove(&self, source_url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM DownloadLedger WHERE source_url = ?")
            .bind(source_url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All entries, most recent first
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT source_url, target_name, recorded_at FROM DownloadLedger ORDER BY recorded_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<LedgerEntry> {
                Ok(LedgerEntry {
                    source_url: row.try_get("source_url")?,
                    target_name: row.try_get("target_name")?,
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect()
    }

    /// Remove every entry, returning how many were dropped
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM DownloadLedger")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
