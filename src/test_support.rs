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


//! Local HTTP fixture for unit and integration tests
//!
//! Answers every connection with the same canned response, written in
//! separate chunks so the client sees incremental progress.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    status: &'static str,
    chunks: Vec<Vec<u8>>,
    declared_length: Option<u64>,
    chunk_delay: Duration,
    stall: bool,
}

impl CannedResponse {
    /// 200 with `body` split into `chunks` equal writes
    pub(crate) fn ok_chunked(body: Vec<u8>, chunks: usize) -> Self {
        let size = (body.len() / chunks.max(1)).max(1);
        let declared_length = Some(body.len() as u64);
        Self {
            status: "200 OK",
            chunks: body.chunks(size).map(|c| c.to_vec()).collect(),
            declared_length,
            chunk_delay: Duration::from_millis(10),
            stall: false,
        }
    }

    /// Bodyless response with the given status line
    pub(crate) fn status(status: &'static str) -> Self {
        Self {
            status,
            chunks: Vec::new(),
            declared_length: Some(0),
            chunk_delay: Duration::ZERO,
            stall: false,
        }
    }

    /// Close-delimited body, no Content-Length header
    pub(crate) fn without_length(mut self) -> Self {
        self.declared_length = None;
        self
    }

    pub(crate) fn with_declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Keep the connection open after the last chunk
    pub(crate) fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Send only the first `chunks` writes, then hold the connection open
    pub(crate) fn stall_after(mut self, chunks: usize) -> Self {
        self.chunks.truncate(chunks);
        self.stall = true;
        self
    }
}

pub(crate) struct TestServer {
    base: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Connections accepted so far
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub(crate) async fn serve(response: CannedResponse) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", response.status);
                if let Some(length) = response.declared_length {
                    head.push_str(&format!("Content-Length: {}\r\n", length));
                }
                head.push_str("\r\n");
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }

                for chunk in &response.chunks {
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(response.chunk_delay).await;
                }

                if response.stall {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        base: format!("http://{}", addr),
        hits,
    }
}
