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


//! Player session state
//!
//! One [`PlayerSession`] backs one player screen. It owns the application
//! state the presentation layer renders ([`PlayerState`], published through a
//! `watch` channel) and the transient message channel ([`UserMessage`]).
//! Only the session writes state; everything else subscribes.

use crate::download::{CancelHandle, DownloadHandle, DownloadRequest, Submission, Supervisor, TransferPhase};
use crate::playback::resolver::PlaybackResolver;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const MSG_FILE_ALREADY_DOWNLOADED: &str = "File already downloaded";
pub const MSG_FILE_DOWNLOADED: &str = "File downloaded";
pub const MSG_DOWNLOAD_IN_PROGRESS: &str = "Download already in progress";
pub const MSG_GENERIC_ERROR: &str = "Error";

/// Everything the player screen renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub source_url: String,
    pub play_when_ready: bool,
    /// Playback position hint in milliseconds
    pub position_ms: u64,
    /// Download percent (0 - 100)
    pub progress: u8,
    pub is_downloading: bool,
}

impl PlayerState {
    fn new(source_url: String) -> Self {
        Self {
            source_url,
            play_when_ready: false,
            position_ms: 0,
            progress: 0,
            is_downloading: false,
        }
    }
}

/// Transient, dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserMessage {
    Info(String),
    Error(String),
}

/// Events reported back by the player engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    StateChanged { play_when_ready: bool },
    FatalError(String),
}

/// What to hand the player engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackRequest {
    pub uri: String,
    pub position_ms: u64,
}

pub struct PlayerSession {
    supervisor: Arc<Supervisor>,
    resolver: PlaybackResolver,
    state_tx: Arc<watch::Sender<PlayerState>>,
    messages_tx: mpsc::UnboundedSender<UserMessage>,
    active_download: Arc<Mutex<Option<ActiveDownload>>>,
}

/// The one transfer this session is tracking
struct ActiveDownload {
    task_id: String,
    cancel: CancelHandle,
}

impl PlayerSession {
    /// Create a session; the receiver yields the user-facing messages
    pub fn new<S: Into<String>>(
        supervisor: Arc<Supervisor>,
        source_url: S,
    ) -> (Self, mpsc::UnboundedReceiver<UserMessage>) {
        let resolver = PlaybackResolver::new(
            supervisor.ledger().clone(),
            supervisor.config().storage_root.clone(),
        );
        let (state_tx, _) = watch::channel(PlayerState::new(source_url.into()));
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();

        let session = Self {
            supervisor,
            resolver,
            state_tx: Arc::new(state_tx),
            messages_tx,
            active_download: Arc::new(Mutex::new(None)),
        };
        (session, messages_rx)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PlayerState {
        self.state_tx.borrow().clone()
    }

    /// Read-only view for the presentation layer
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state_tx.subscribe()
    }

    /// Switch to another video; playback does not auto-start
    pub fn set_source_url<S: Into<String>>(&self, source_url: S) {
        let source_url = source_url.into();
        self.state_tx.send_modify(|state| {
            state.source_url = source_url;
            state.play_when_ready = false;
        });
    }

    /// Download the current video unless it is already cached
    ///
    /// Only one download runs per session; clicks while one is in flight
    /// are answered with a message. Returns the task tracking the download,
    /// if one was started.
    pub async fn on_download_clicked(&self) -> Option<JoinHandle<()>> {
        let claimed = self.state_tx.send_if_modified(|state| {
            if state.is_downloading {
                return false;
            }
            state.is_downloading = true;
            true
        });
        if !claimed {
            self.info(MSG_DOWNLOAD_IN_PROGRESS);
            return None;
        }

        let tracker = self.start_download().await;
        if tracker.is_none() {
            self.state_tx.send_modify(|state| state.is_downloading = false);
        }
        tracker
    }

    async fn start_download(&self) -> Option<JoinHandle<()>> {
        let source_url = self.state().source_url;

        match self.supervisor.ledger().contains(&source_url).await {
            Ok(true) => {
                self.info(MSG_FILE_ALREADY_DOWNLOADED);
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                self.error(e.user_message());
                return None;
            }
        }

        let request = match DownloadRequest::new(source_url) {
            Ok(request) => request,
            Err(e) => {
                self.error(e.user_message());
                return None;
            }
        };

        self.state_tx.send_modify(|state| state.progress = 0);

        match self.supervisor.submit(request).await {
            Ok(Submission::Started(handle)) => {
                *self.lock_active() = Some(ActiveDownload {
                    task_id: handle.task_id().to_string(),
                    cancel: handle.cancel_handle(),
                });
                Some(tokio::spawn(Self::track(
                    handle,
                    Arc::clone(&self.state_tx),
                    self.messages_tx.clone(),
                    Arc::clone(&self.active_download),
                )))
            }
            Ok(Submission::AlreadyDownloaded { .. }) => {
                self.info(MSG_FILE_ALREADY_DOWNLOADED);
                None
            }
            Err(e) => {
                self.error(e.user_message());
                None
            }
        }
    }

    /// Cancel the download started from this session, if any
    pub fn cancel_download(&self) -> bool {
        match self.lock_active().as_ref() {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// URI for the player engine, or `None` after reporting an error
    pub async fn media_source_uri(&self) -> Option<String> {
        let source_url = self.state().source_url;
        match self.resolver.resolve(&source_url).await {
            Ok(source) => Some(source.uri().to_string()),
            Err(e) => {
                self.error(e.user_message());
                None
            }
        }
    }

    /// URI plus position hint for (re)initializing the player engine
    pub async fn playback_request(&self) -> Option<PlaybackRequest> {
        let uri = self.media_source_uri().await?;
        Some(PlaybackRequest {
            uri,
            position_ms: self.state().position_ms,
        })
    }

    pub fn on_player_event(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::StateChanged { play_when_ready } => {
                self.state_tx.send_if_modified(|state| {
                    let changed = state.play_when_ready != play_when_ready;
                    state.play_when_ready = play_when_ready;
                    changed
                });
            }
            PlayerEvent::FatalError(message) => {
                self.state_tx.send_modify(|state| state.play_when_ready = false);
                self.error(message);
            }
        }
    }

    /// Player engine is being torn down; keep where it was
    pub fn release(&self, play_when_ready: bool, position_ms: u64) {
        self.state_tx.send_modify(|state| {
            state.play_when_ready = play_when_ready;
            state.position_ms = position_ms;
        });
    }

    async fn track(
        mut handle: DownloadHandle,
        state_tx: Arc<watch::Sender<PlayerState>>,
        messages_tx: mpsc::UnboundedSender<UserMessage>,
        active_download: Arc<Mutex<Option<ActiveDownload>>>,
    ) {
        let task_id = handle.task_id().to_string();
        let mut terminal = None;
        while let Some(status) = handle.next().await {
            state_tx.send_modify(|state| state.progress = status.percent);
            if status.is_terminal() {
                terminal = Some(status);
            }
        }

        let message = match terminal {
            Some(status) if status.phase == TransferPhase::Succeeded => {
                UserMessage::Info(MSG_FILE_DOWNLOADED.to_string())
            }
            Some(status) => UserMessage::Error(non_empty(status.error_detail.unwrap_or_default())),
            None => UserMessage::Error("Download task ended unexpectedly".to_string()),
        };

        if let Ok(mut active) = active_download.lock() {
            if active.as_ref().is_some_and(|a| a.task_id == task_id) {
                *active = None;
            }
        }
        state_tx.send_modify(|state| state.is_downloading = false);
        let _ = messages_tx.send(message);
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveDownload>> {
        // A poisoned slot only ever holds a cancel handle; keep using it.
        self.active_download
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn info<S: Into<String>>(&self, message: S) {
        let _ = self.messages_tx.send(UserMessage::Info(message.into()));
    }

    fn error<S: Into<String>>(&self, message: S) {
        let _ = self.messages_tx.send(UserMessage::Error(non_empty(message.into())));
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        MSG_GENERIC_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::download::NoopNotifier;
    use crate::storage::{Database, DownloadLedger};
    use crate::test_support::{serve, CannedResponse};

    async fn session(
        root: &std::path::Path,
        url: &str,
    ) -> (PlayerSession, mpsc::UnboundedReceiver<UserMessage>) {
        let db = Database::new_in_memory().await.unwrap();
        let ledger = DownloadLedger::new(db.pool().clone());
        let supervisor =
            Supervisor::new(CoreConfig::new(root), ledger, Arc::new(NoopNotifier)).unwrap();
        PlayerSession::new(Arc::new(supervisor), url)
    }

    #[tokio::test]
    async fn test_download_then_play_locally() {
        let server = serve(CannedResponse::ok_chunked(vec![5u8; 10_000], 2)).await;
        let dir = tempfile::tempdir().unwrap();
        let url = server.url("/video.mp4");
        let (session, mut messages) = session(dir.path(), &url).await;

        assert_eq!(session.media_source_uri().await.as_deref(), Some(url.as_str()));

        let tracker = session.on_download_clicked().await.expect("download should start");
        tracker.await.unwrap();

        assert_eq!(messages.recv().await, Some(UserMessage::Info(MSG_FILE_DOWNLOADED.to_string())));
        let state = session.state();
        assert!(!state.is_downloading);
        assert_eq!(state.progress, 100);

        let uri = session.media_source_uri().await.unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("_video.mp4"));

        assert!(session.on_download_clicked().await.is_none());
        assert_eq!(
            messages.recv().await,
            Some(UserMessage::Info(MSG_FILE_ALREADY_DOWNLOADED.to_string()))
        );
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_failed_download_reports_error() {
        let server = serve(CannedResponse::status("404 Not Found")).await;
        let dir = tempfile::tempdir().unwrap();
        let (session, mut messages) = session(dir.path(), &server.url("/gone.mp4")).await;

        session.on_download_clicked().await.unwrap().await.unwrap();

        match messages.recv().await {
            Some(UserMessage::Error(text)) => assert!(text.contains("404")),
            other => panic!("expected error message, got {:?}", other),
        }
        assert!(!session.state().is_downloading);
        assert!(!session.cancel_download());
    }

    #[tokio::test]
    async fn test_malformed_url_surfaces_message() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut messages) = session(dir.path(), "not a url").await;

        assert!(session.on_download_clicked().await.is_none());
        assert!(matches!(messages.recv().await, Some(UserMessage::Error(_))));
        assert!(!session.state().is_downloading);

        assert_eq!(session.playback_request().await, None);
        assert!(matches!(messages.recv().await, Some(UserMessage::Error(_))));
    }

    #[tokio::test]
    async fn test_player_events_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut messages) = session(dir.path(), "https://host/a.mp4").await;
        let mut watcher = session.subscribe();

        session.on_player_event(PlayerEvent::StateChanged { play_when_ready: true });
        assert!(watcher.borrow_and_update().play_when_ready);

        session.release(true, 42_000);
        let request = session.playback_request().await.unwrap();
        assert_eq!(
            request,
            PlaybackRequest {
                uri: "https://host/a.mp4".to_string(),
                position_ms: 42_000
            }
        );

        session.on_player_event(PlayerEvent::FatalError(String::new()));
        assert!(!session.state().play_when_ready);
        assert_eq!(messages.recv().await, Some(UserMessage::Error(MSG_GENERIC_ERROR.to_string())));

        session.on_player_event(PlayerEvent::StateChanged { play_when_ready: true });
        session.set_source_url("https://host/b.mp4");
        let state = session.state();
        assert_eq!(state.source_url, "https://host/b.mp4");
        assert!(!state.play_when_ready);
    }

    #[tokio::test]
    async fn test_second_click_while_downloading_is_rejected() {
        let slow = serve(
            CannedResponse::ok_chunked(vec![8u8; 20_000], 1)
                .with_declared_length(100_000)
                .stalling(),
        )
        .await;
        let fast = serve(CannedResponse::ok_chunked(vec![9u8; 1_000], 1)).await;
        let dir = tempfile::tempdir().unwrap();
        let (session, mut messages) = session(dir.path(), &slow.url("/slow.mp4")).await;
        let mut watcher = session.subscribe();

        let tracker = session.on_download_clicked().await.expect("download should start");
        while watcher.borrow_and_update().progress < 20 {
            watcher.changed().await.unwrap();
        }

        session.set_source_url(fast.url("/fast.mp4"));
        assert!(session.on_download_clicked().await.is_none());
        assert_eq!(
            messages.recv().await,
            Some(UserMessage::Info(MSG_DOWNLOAD_IN_PROGRESS.to_string()))
        );
        assert_eq!(fast.hits(), 0);

        let state = session.state();
        assert!(state.is_downloading);
        assert_eq!(state.progress, 20);

        assert!(session.cancel_download());
        tracker.await.unwrap();
        assert_eq!(
            messages.recv().await,
            Some(UserMessage::Error("Download cancelled".to_string()))
        );
        assert!(!session.state().is_downloading);
        assert!(!session.cancel_download());

        // The slot is free again
        session.on_download_clicked().await.unwrap().await.unwrap();
        assert_eq!(messages.recv().await, Some(UserMessage::Info(MSG_FILE_DOWNLOADED.to_string())));
        assert_eq!(fast.hits(), 1);
    }
}
