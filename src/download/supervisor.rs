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


//! Download task supervisor
//!
//! This module owns the lifecycle of background transfers:
//! - Consults the ledger before starting (cached URLs never hit the network)
//! - Runs each submission on its own tokio task, bounded by a semaphore
//! - Keeps the host informed through a [`HostNotifier`]
//! - Supports cooperative cancellation by task id
//! - Records the ledger entry only after the file is complete
//!
//! Status for a task flows through a single-producer channel that is closed
//! right after the terminal status, so subscribers simply drain it.

use crate::config::CoreConfig;
use crate::download::cancel::{cancel_pair, CancelHandle, CancelSignal};
use crate::download::notifier::{ForegroundInfo, HostNotifier};
use crate::download::progress::{TransferPhase, TransferStatus};
use crate::download::request::DownloadRequest;
use crate::download::transfer::{TransferEngine, TransferResult};
use crate::error::{PlayerError, Result};
use crate::storage::{Database, DownloadLedger};
use futures_util::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock, Semaphore};
use uuid::Uuid;

/// Result of [`Supervisor::submit`]
#[derive(Debug)]
pub enum Submission {
    /// The URL is already in the ledger; nothing was started
    AlreadyDownloaded { target_name: String },
    /// A background transfer was started
    Started(DownloadHandle),
}

/// Subscriber side of one submitted download
///
/// Statuses can be consumed once; after the terminal status the stream ends.
#[derive(Debug)]
pub struct DownloadHandle {
    task_id: String,
    request: DownloadRequest,
    status_rx: mpsc::UnboundedReceiver<TransferStatus>,
    cancel: CancelHandle,
}

impl DownloadHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    /// Cancel action for the host UI
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next status, or `None` once the terminal status has been consumed
    pub async fn next(&mut self) -> Option<TransferStatus> {
        self.status_rx.recv().await
    }

    /// Drain the remaining statuses and return the terminal one
    pub async fn wait(mut self) -> TransferStatus {
        let mut last = None;
        while let Some(status) = self.next().await {
            last = Some(status);
        }

        match last {
            Some(status) if status.is_terminal() => status,
            Some(status) => TransferStatus::failed(status.percent, "Download task ended unexpectedly"),
            None => TransferStatus::failed(0, "Download task ended unexpectedly"),
        }
    }

    /// Consume the handle as a stream of statuses
    pub fn into_stream(self) -> impl Stream<Item = TransferStatus> + Send {
        futures_util::stream::unfold(self.status_rx, |mut rx| async move {
            rx.recv().await.map(|status| (status, rx))
        })
    }
}

/// Everything a worker needs, cloned into each spawned task
#[derive(Clone)]
struct WorkerContext {
    config: Arc<CoreConfig>,
    engine: TransferEngine,
    ledger: DownloadLedger,
    notifier: Arc<dyn HostNotifier>,
    semaphore: Arc<Semaphore>,
    active: Arc<RwLock<HashMap<String, CancelHandle>>>,
}

/// Starts, tracks and finalizes background downloads
pub struct Supervisor {
    ctx: WorkerContext,
}

impl Supervisor {
    /// Create a supervisor over an existing ledger
    pub fn new(
        config: CoreConfig,
        ledger: DownloadLedger,
        notifier: Arc<dyn HostNotifier>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = TransferEngine::new(&config)?;
        Ok(Self::with_engine(config, ledger, notifier, engine))
    }

    pub fn with_engine(
        config: CoreConfig,
        ledger: DownloadLedger,
        notifier: Arc<dyn HostNotifier>,
        engine: TransferEngine,
    ) -> Self {
        let max_concurrent = config.max_concurrent_downloads.max(1);
        Self {
            ctx: WorkerContext {
                config: Arc::new(config),
                engine,
                ledger,
                notifier,
                semaphore: Arc::new(Semaphore::new(max_concurrent)),
                active: Arc::new(RwLock::new(HashMap::new())),
            },
        }
    }

    /// Create the storage root, open the ledger database and build a supervisor
    pub async fn open(config: CoreConfig, notifier: Arc<dyn HostNotifier>) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.storage_root).await?;
        let db = Database::new(config.database_path()).await?;
        let ledger = DownloadLedger::new(db.pool().clone());
        Self::new(config, ledger, notifier)
    }

    pub fn ledger(&self) -> &DownloadLedger {
        &self.ctx.ledger
    }

    pub fn config(&self) -> &CoreConfig {
        &self.ctx.config
    }

    /// Start a download unless the URL is already in the ledger
    ///
    /// Every call starts an independent transfer; concurrent submissions of
    /// the same URL are not coalesced.
    pub async fn submit(&self, request: DownloadRequest) -> Result<Submission> {
        if let Some(target_name) = self.ctx.ledger.get(request.source_url()).await? {
            tracing::info!(
                "{} already downloaded as {}",
                request.source_url(),
                target_name
            );
            return Ok(Submission::AlreadyDownloaded { target_name });
        }

        let task_id = Uuid::new_v4().to_string();
        let (cancel, signal) = cancel_pair();
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        self.ctx
            .active
            .write()
            .await
            .insert(task_id.clone(), cancel.clone());

        tracing::info!(
            task_id = %task_id,
            "Starting download of {} into {}",
            request.source_url(),
            request.target_name()
        );

        let ctx = self.ctx.clone();
        let worker_task_id = task_id.clone();
        let worker_request = request.clone();
        tokio::spawn(async move {
            Self::run_task(ctx, worker_task_id, worker_request, status_tx, signal).await;
        });

        Ok(Submission::Started(DownloadHandle {
            task_id,
            request,
            status_rx,
            cancel,
        }))
    }

    /// Request cancellation of a running task. Returns false for unknown ids.
    pub async fn cancel(&self, task_id: &str) -> bool {
        match self.ctx.active.read().await.get(task_id) {
            Some(handle) => {
                tracing::info!(task_id = %task_id, "Cancellation requested");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything still running (host teardown)
    pub async fn cancel_all(&self) {
        for handle in self.ctx.active.read().await.values() {
            handle.cancel();
        }
    }

    /// Number of submitted tasks that have not reached a terminal state
    pub async fn active_count(&self) -> usize {
        self.ctx.active.read().await.len()
    }

    async fn run_task(
        ctx: WorkerContext,
        task_id: String,
        request: DownloadRequest,
        status_tx: mpsc::UnboundedSender<TransferStatus>,
        mut signal: CancelSignal,
    ) {
        // Queued tasks must stay cancellable while waiting for a slot.
        let permit = tokio::select! {
            biased;
            _ = signal.cancelled() => None,
            permit = Arc::clone(&ctx.semaphore).acquire_owned() => Some(permit),
        };

        let terminal = match permit {
            Some(Ok(_permit)) => {
                Self::transfer(&ctx, &task_id, &request, &status_tx, &mut signal).await
            }
            Some(Err(_)) => TransferStatus::failed(0, "Download supervisor shut down"),
            None => {
                tracing::info!(task_id = %task_id, "Cancelled while queued");
                TransferStatus::failed(0, PlayerError::Cancelled.to_string())
            }
        };

        ctx.active.write().await.remove(&task_id);
        ctx.notifier.finished(&task_id);

        match terminal.phase {
            TransferPhase::Succeeded => {
                tracing::info!(task_id = %task_id, "File downloaded: {}", request.target_name())
            }
            _ => tracing::warn!(
                task_id = %task_id,
                "Download of {} failed: {}",
                request.source_url(),
                terminal.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }

        // The subscriber may have dropped its handle; the outcome stands either way.
        let _ = status_tx.send(terminal);
    }

    async fn transfer(
        ctx: &WorkerContext,
        task_id: &str,
        request: &DownloadRequest,
        status_tx: &mpsc::UnboundedSender<TransferStatus>,
        signal: &mut CancelSignal,
    ) -> TransferStatus {
        let title = request.target_name().to_string();
        let _ = status_tx.send(TransferStatus::started());
        ctx.notifier.ongoing(&ForegroundInfo {
            task_id: task_id.to_string(),
            title: title.clone(),
            percent: 0,
        });

        if let Err(e) = tokio::fs::create_dir_all(&ctx.config.storage_root).await {
            return TransferStatus::failed(0, format!("Failed to create storage root: {}", e));
        }
        let destination = ctx.config.file_path(request.target_name());

        let mut last_percent = 0u8;
        let result = ctx
            .engine
            .run(request.source_url(), &destination, signal, |percent| {
                last_percent = percent;
                tracing::debug!(task_id = %task_id, "{}%", percent);
                let _ = status_tx.send(TransferStatus::running(percent));
                ctx.notifier.ongoing(&ForegroundInfo {
                    task_id: task_id.to_string(),
                    title: title.clone(),
                    percent,
                });
            })
            .await;

        match result {
            TransferResult::Success { .. } => {
                match ctx
                    .ledger
                    .put(request.source_url(), request.target_name())
                    .await
                {
                    Ok(()) => TransferStatus::succeeded(),
                    Err(e) => {
                        // Unrecorded files would never be found again
                        let _ = tokio::fs::remove_file(&destination).await;
                        TransferStatus::failed(
                            last_percent,
                            format!("Failed to record download: {}", e),
                        )
                    }
                }
            }
            TransferResult::Failure(failure) => TransferStatus::failed(last_percent, failure.reason),
        }
    }
}
