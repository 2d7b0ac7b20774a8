//! End-to-end download flow against a local HTTP server
//!
//! Covers the supervisor, transfer engine, ledger and resolver together,
//! with the ledger backed by a real database file.

#[path = "../src/test_support.rs"]
#[allow(dead_code)]
mod test_support;

use test_support::{serve, CannedResponse};
use player_core::download::{
    DownloadHandle, DownloadRequest, NoopNotifier, Submission, Supervisor, TransferPhase,
    TransferStatus,
};
use player_core::playback::{local_file_uri, PlaybackResolver, PlaybackSource};
use player_core::CoreConfig;
use std::path::Path;
use std::sync::Arc;

async fn open(root: &Path) -> Supervisor {
    Supervisor::open(CoreConfig::new(root), Arc::new(NoopNotifier))
        .await
        .unwrap()
}

fn started(outcome: Submission) -> DownloadHandle {
    match outcome {
        Submission::Started(handle) => handle,
        Submission::AlreadyDownloaded { target_name } => {
            panic!("unexpected cache hit for {}", target_name)
        }
    }
}

async fn drain(mut handle: DownloadHandle) -> Vec<TransferStatus> {
    let mut statuses = Vec::new();
    while let Some(status) = handle.next().await {
        statuses.push(status);
    }
    statuses
}

fn running_percents(statuses: &[TransferStatus]) -> Vec<u8> {
    statuses
        .iter()
        .filter(|s| s.phase == TransferPhase::Running && s.percent > 0)
        .map(|s| s.percent)
        .collect()
}

#[tokio::test]
async fn test_full_download_records_ledger() {
    let server = serve(CannedResponse::ok_chunked(vec![0x5a; 1_000_000], 10)).await;
    let dir = tempfile::tempdir().unwrap();
    let supervisor = open(dir.path()).await;

    let url = server.url("/video.mp4");
    let request = DownloadRequest::new(url.clone()).unwrap();
    let target = request.target_name().to_string();
    assert!(target.ends_with("_video.mp4"));

    let statuses = drain(started(supervisor.submit(request).await.unwrap())).await;

    // Reads may split the server's writes, so only the shape is fixed.
    let percents = running_percents(&statuses);
    assert!(percents.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(percents.last(), Some(&100));
    assert!(statuses.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(statuses.last(), Some(&TransferStatus::succeeded()));
    assert_eq!(statuses.iter().filter(|s| s.is_terminal()).count(), 1);

    assert_eq!(supervisor.ledger().get(&url).await.unwrap(), Some(target.clone()));
    let written = std::fs::metadata(dir.path().join(&target)).unwrap();
    assert_eq!(written.len(), 1_000_000);
}

#[tokio::test]
async fn test_not_found_leaves_nothing_behind() {
    let server = serve(CannedResponse::status("404 Not Found")).await;
    let dir = tempfile::tempdir().unwrap();
    let supervisor = open(dir.path()).await;

    let url = server.url("/video.mp4");
    let request = DownloadRequest::new(url.clone()).unwrap();
    let target = request.target_name().to_string();

    let statuses = drain(started(supervisor.submit(request).await.unwrap())).await;

    assert!(running_percents(&statuses).is_empty());
    let terminal = statuses.last().unwrap();
    assert_eq!(terminal.phase, TransferPhase::Failed);
    assert!(!terminal.error_detail.as_deref().unwrap_or("").is_empty());

    assert!(!dir.path().join(&target).exists());
    assert_eq!(supervisor.ledger().get(&url).await.unwrap(), None);
}

#[tokio::test]
async fn test_ledger_hit_skips_network_and_resolves_locally() {
    let server = serve(CannedResponse::ok_chunked(vec![0x5a; 1_000], 1)).await;
    let dir = tempfile::tempdir().unwrap();
    let supervisor = open(dir.path()).await;

    let url = server.url("/video.mp4");
    supervisor.ledger().put(&url, "abc_video.mp4").await.unwrap();

    match supervisor.submit(DownloadRequest::new(url.clone()).unwrap()).await.unwrap() {
        Submission::AlreadyDownloaded { target_name } => assert_eq!(target_name, "abc_video.mp4"),
        Submission::Started(_) => panic!("ledger hit must not start a transfer"),
    }
    assert_eq!(server.hits(), 0);

    let resolver = PlaybackResolver::new(supervisor.ledger().clone(), dir.path());
    let source = resolver.resolve(&url).await.unwrap();
    assert!(source.is_local());
    assert_eq!(source.uri(), local_file_uri(dir.path(), "abc_video.mp4").unwrap());
}

#[tokio::test]
async fn test_cancel_after_forty_percent() {
    let server = serve(CannedResponse::ok_chunked(vec![0x5a; 1_000_000], 10).stall_after(5)).await;
    let dir = tempfile::tempdir().unwrap();
    let supervisor = open(dir.path()).await;

    let url = server.url("/video.mp4");
    let request = DownloadRequest::new(url.clone()).unwrap();
    let target = request.target_name().to_string();
    let mut handle = started(supervisor.submit(request).await.unwrap());

    while let Some(status) = handle.next().await {
        if status.percent >= 40 {
            handle.cancel();
            break;
        }
    }

    let terminal = handle.wait().await;
    assert_eq!(terminal.phase, TransferPhase::Failed);
    assert_eq!(terminal.error_detail.as_deref(), Some("Download cancelled"));
    assert!(terminal.percent >= 40);

    assert!(!dir.path().join(&target).exists());
    assert_eq!(supervisor.ledger().get(&url).await.unwrap(), None);
    assert_eq!(supervisor.active_count().await, 0);
}

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let server = serve(CannedResponse::ok_chunked(vec![0x5a; 10_000], 2)).await;
    let dir = tempfile::tempdir().unwrap();
    let url = server.url("/clip.mp4");

    {
        let supervisor = open(dir.path()).await;
        let handle = started(
            supervisor
                .submit(DownloadRequest::new(url.clone()).unwrap())
                .await
                .unwrap(),
        );
        assert_eq!(handle.wait().await.phase, TransferPhase::Succeeded);
    }

    let reopened = open(dir.path()).await;
    assert!(reopened.ledger().contains(&url).await.unwrap());

    let resolver = PlaybackResolver::new(reopened.ledger().clone(), dir.path());
    match resolver.resolve(&url).await.unwrap() {
        PlaybackSource::Local { path, .. } => assert!(path.exists()),
        other => panic!("expected local source, got {:?}", other),
    }
}
