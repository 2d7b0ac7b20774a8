uniffi::setup_scaffolding!();

pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod playback;
pub mod storage;

// JNI bridge for Android
#[cfg(target_os = "android")]
mod jni_bridge;

#[cfg(test)]
mod test_support;

pub use config::CoreConfig;
pub use download::{DownloadHandle, DownloadRequest, Submission, Supervisor, TransferStatus};
pub use error::{PlayerError, Result};
pub use playback::{PlaybackResolver, PlaybackSource, PlayerSession};
pub use storage::{Database, DownloadLedger};

/// Local file name a download of `source_url` would be stored under
#[uniffi::export]
pub fn generate_target_name(source_url: String) -> Option<String> {
    download::generate_target_name(&source_url).ok()
}

/// `file://` URI for a file inside the storage root
#[uniffi::export]
pub fn local_file_uri(storage_root: String, target_name: String) -> Option<String> {
    playback::local_file_uri(std::path::Path::new(&storage_root), &target_name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_target_name() {
        let name = generate_target_name("https://host/media/clip.mp4".to_string()).unwrap();
        assert!(name.ends_with("_clip.mp4"));
        assert!(generate_target_name("ftp://host/clip.mp4".to_string()).is_none());
    }

    #[test]
    fn test_local_file_uri() {
        let uri = local_file_uri("/data/files".to_string(), "a_clip.mp4".to_string());
        assert_eq!(uri.as_deref(), Some("file:///data/files/a_clip.mp4"));
    }
}
