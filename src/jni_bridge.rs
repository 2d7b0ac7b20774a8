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


//! JNI bridge for Android
//!
//! Exposes the download supervisor and playback resolver to the Kotlin host
//! class `com.zebannikolay.videoplayer.PlayerCoreBridge`.
//!
//! # Design Patterns
//! 1. **JSON Communication**: parameters and results cross the boundary as JSON
//! 2. **Error Handling**: errors come back as JSON error responses
//! 3. **Async Runtime**: one shared Tokio runtime drives every transfer
//! 4. **No Panics**: panics are caught before they reach the JVM
//!
//! # Response Format
//! ```json
//! { "success": true, "data": { ... } }
//! ```
//! Or on error:
//! ```json
//! { "success": false, "error": "Error message" }
//! ```

use crate::config::CoreConfig;
use crate::download::{
    DownloadRequest, StatusRegistry, Submission, Supervisor, TracingNotifier, TransferStatus,
};
use crate::error::{PlayerError, Result};
use crate::playback::{PlaybackResolver, PlaybackSource};
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref RUNTIME: tokio::runtime::Runtime =
        tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    // storage root -> supervisor
    static ref SUPERVISORS: tokio::sync::Mutex<HashMap<String, Arc<Supervisor>>> =
        tokio::sync::Mutex::new(HashMap::new());

    static ref STATUSES: StatusRegistry = StatusRegistry::new();
}

async fn get_or_create_supervisor(storage_root: &str) -> Result<Arc<Supervisor>> {
    let mut supervisors = SUPERVISORS.lock().await;

    if let Some(supervisor) = supervisors.get(storage_root) {
        return Ok(Arc::clone(supervisor));
    }

    crate::logging::init_logging(tracing::Level::INFO);
    let supervisor = Supervisor::open(CoreConfig::new(storage_root), Arc::new(TracingNotifier)).await?;
    let supervisor = Arc::new(supervisor);
    supervisors.insert(storage_root.to_string(), Arc::clone(&supervisor));

    Ok(supervisor)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn jstring_to_string(env: &mut JNIEnv, jstr: JString) -> Result<String> {
    env.get_string(&jstr)
        .map(|s| s.into())
        .map_err(|e| PlayerError::internal(format!("JNI string conversion failed: {}", e)))
}

fn success_response<T: Serialize>(data: T) -> String {
    serde_json::json!({
        "success": true,
        "data": data
    })
    .to_string()
}

fn error_response(error: &str) -> String {
    serde_json::json!({
        "success": false,
        "error": error
    })
    .to_string()
}

fn result_to_json<T: Serialize>(result: Result<T>) -> String {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_response(&e.user_message()),
    }
}

/// Wrap a function call with panic catching
fn catch_panic<F>(f: F) -> String
where
    F: FnOnce() -> String,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic_err) => {
            let panic_msg = if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic occurred".to_string()
            };
            error_response(&format!("Rust panic: {}", panic_msg))
        }
    }
}

/// Returns a null jstring if the JVM refuses the allocation
fn to_jstring(env: &mut JNIEnv, response: String) -> jstring {
    env.new_string(response)
        .map(|s| s.into_raw())
        .unwrap_or(std::ptr::null_mut())
}

/// Read the JSON parameter string and run `handler` on it with panics caught
fn with_params<P, F>(env: &mut JNIEnv, params_json: JString, handler: F) -> jstring
where
    P: for<'de> Deserialize<'de>,
    F: FnOnce(P) -> String,
{
    let params_str = match jstring_to_string(env, params_json) {
        Ok(s) => s,
        Err(e) => return to_jstring(env, error_response(&e.to_string())),
    };

    let response = catch_panic(move || match serde_json::from_str::<P>(&params_str) {
        Ok(params) => handler(params),
        Err(e) => error_response(&format!("Invalid JSON: {}", e)),
    });

    to_jstring(env, response)
}

#[derive(Deserialize)]
struct SourceParams {
    storage_root: String,
    source_url: String,
}

#[derive(Deserialize)]
struct TaskParams {
    storage_root: String,
    task_id: String,
}

// ============================================================================
// OPERATIONS
// ============================================================================

async fn resolve_playback(params: SourceParams) -> Result<PlaybackSource> {
    let supervisor = get_or_create_supervisor(&params.storage_root).await?;
    let resolver =
        PlaybackResolver::new(supervisor.ledger().clone(), &supervisor.config().storage_root);
    resolver.resolve(&params.source_url).await
}

async fn start_download(params: SourceParams) -> Result<serde_json::Value> {
    let supervisor = get_or_create_supervisor(&params.storage_root).await?;
    let request = DownloadRequest::new(params.source_url)?;

    match supervisor.submit(request).await? {
        Submission::AlreadyDownloaded { target_name } => Ok(serde_json::json!({
            "already_downloaded": true,
            "target_name": target_name,
        })),
        Submission::Started(mut handle) => {
            let task_id = handle.task_id().to_string();
            let target_name = handle.request().target_name().to_string();
            STATUSES.record(&task_id, TransferStatus::started());
            tracing::debug!("{} download statuses tracked", STATUSES.len());

            let drain_id = task_id.clone();
            RUNTIME.spawn(async move {
                while let Some(status) = handle.next().await {
                    STATUSES.record(&drain_id, status);
                }
            });

            Ok(serde_json::json!({
                "already_downloaded": false,
                "task_id": task_id,
                "target_name": target_name,
            }))
        }
    }
}

async fn cancel_download(params: TaskParams) -> Result<serde_json::Value> {
    let supervisor = get_or_create_supervisor(&params.storage_root).await?;
    let cancelled = supervisor.cancel(&params.task_id).await;
    Ok(serde_json::json!({ "cancelled": cancelled }))
}

// ============================================================================
// PLAYBACK
// ============================================================================

/// Resolve what the player should open
///
/// # Arguments (JSON string)
/// ```json
/// { "storage_root": "/data/user/0/app/files", "source_url": "https://..." }
/// ```
///
/// # Returns (JSON)
/// ```json
/// { "success": true, "data": { "kind": "local", "path": "...", "uri": "file:///..." } }
/// ```
#[no_mangle]
pub extern "C" fn Java_com_zebannikolay_videoplayer_PlayerCoreBridge_nativeResolvePlaybackUri(
    mut env: JNIEnv,
    _class: JClass,
    params_json: JString,
) -> jstring {
    with_params(&mut env, params_json, |params: SourceParams| {
        result_to_json(RUNTIME.block_on(resolve_playback(params)))
    })
}

// ============================================================================
// DOWNLOADS
// ============================================================================

/// Start downloading a video unless it is already in the ledger
///
/// # Arguments (JSON string)
/// ```json
/// { "storage_root": "/data/user/0/app/files", "source_url": "https://..." }
/// ```
///
/// # Returns (JSON)
/// ```json
/// { "success": true, "data": { "already_downloaded": false, "task_id": "...", "target_name": "..." } }
/// ```
#[no_mangle]
pub extern "C" fn Java_com_zebannikolay_videoplayer_PlayerCoreBridge_nativeStartDownload(
    mut env: JNIEnv,
    _class: JClass,
    params_json: JString,
) -> jstring {
    with_params(&mut env, params_json, |params: SourceParams| {
        result_to_json(RUNTIME.block_on(start_download(params)))
    })
}

/// Latest status of a started download
///
/// A terminal status is returned once; later calls report an unknown task.
///
/// # Returns (JSON)
/// ```json
/// { "success": true, "data": { "percent": 40, "phase": "running", "error_detail": null } }
/// ```
#[no_mangle]
pub extern "C" fn Java_com_zebannikolay_videoplayer_PlayerCoreBridge_nativeGetDownloadStatus(
    mut env: JNIEnv,
    _class: JClass,
    params_json: JString,
) -> jstring {
    with_params(&mut env, params_json, |params: TaskParams| {
        let status = STATUSES.take(&params.task_id).ok_or_else(|| {
            PlayerError::internal(format!("Unknown download task: {}", params.task_id))
        });
        result_to_json(status)
    })
}

/// Request cancellation of a running download (notification cancel action)
#[no_mangle]
pub extern "C" fn Java_com_zebannikolay_videoplayer_PlayerCoreBridge_nativeCancelDownload(
    mut env: JNIEnv,
    _class: JClass,
    params_json: JString,
) -> jstring {
    with_params(&mut env, params_json, |params: TaskParams| {
        result_to_json(RUNTIME.block_on(cancel_download(params)))
    })
}

/// Target file name for a source URL (plain string argument)
#[no_mangle]
pub extern "C" fn Java_com_zebannikolay_videoplayer_PlayerCoreBridge_nativeGenerateTargetName(
    mut env: JNIEnv,
    _class: JClass,
    source_url: JString,
) -> jstring {
    let response = match jstring_to_string(&mut env, source_url) {
        Ok(url) => catch_panic(move || result_to_json(crate::download::generate_target_name(&url))),
        Err(e) => error_response(&e.to_string()),
    };
    to_jstring(&mut env, response)
}
