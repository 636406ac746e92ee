//! Folder persistence for finished recordings

use crate::capture::{PermissionState, RecordingBlob};
use crate::storage::kv::{self, KeyValueStore, Partition};
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store key of the chosen folder
pub const FOLDER_HANDLE_KEY: &str = "recordingsFolder";

/// File extensions listed as recordings
pub const RECORDING_EXTENSIONS: [&str; 9] = ["webm", "mp4", "mov", "mkv", "mp3", "wav", "m4a", "ogg", "opus"];

/// Durable reference to the recordings folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderHandle {
    pub path: PathBuf,
    pub name: String,
}

impl FolderHandle {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { path, name }
    }
}

/// One entry of the recording list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingFileSummary {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Contents of a saved recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where finished recordings go
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn folder_handle(&self) -> Option<FolderHandle>;

    async fn permission_state(&self) -> PermissionState;

    async fn save_recording(&self, blob: &RecordingBlob, filename: &str) -> AppResult<()>;

    /// Recordings in the folder, newest first
    async fn refresh_recordings(&self) -> AppResult<Vec<RecordingFileSummary>>;

    async fn read_recording_file(&self, filename: &str) -> AppResult<RecordingFile>;
}

/// Extension of `name` when it is a recording type
pub fn recording_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    RECORDING_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Mime type from a recording's extension
pub fn mime_type_for(name: &str) -> &'static str {
    match recording_extension(name).as_deref() {
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("opus") => "audio/opus",
        _ => "application/octet-stream",
    }
}

fn validate_filename(filename: &str) -> AppResult<()> {
    let plain = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != "..";
    if plain {
        Ok(())
    } else {
        Err(AppError::InvalidSelection(format!("invalid recording name {filename:?}")))
    }
}

fn io_error(context: &str, filename: &str, error: std::io::Error) -> AppError {
    match error.kind() {
        std::io::ErrorKind::NotFound => AppError::NotFound(format!("{context} {filename}")),
        std::io::ErrorKind::PermissionDenied => AppError::PermissionDenied(format!("{context} {filename}")),
        _ => AppError::PersistenceFailed(format!("{context} {filename}: {error}")),
    }
}

/// Filesystem folder remembered in the key-value store
pub struct FolderStorage {
    store: Arc<dyn KeyValueStore>,
    folder: RwLock<Option<FolderHandle>>,
    recordings: RwLock<Vec<RecordingFileSummary>>,
}

impl FolderStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            folder: RwLock::new(None),
            recordings: RwLock::new(Vec::new()),
        }
    }

    /// Load the previously chosen folder, if any
    pub async fn restore(&self) -> Option<FolderHandle> {
        let handle: Option<FolderHandle> = kv::load(self.store.as_ref(), Partition::Handles, FOLDER_HANDLE_KEY).await;
        if let Some(handle) = &handle {
            tracing::info!("Restored recordings folder {:?}", handle.path);
        }
        *self.folder.write() = handle.clone();
        handle
    }

    /// Use `path` as the recordings folder and remember it
    pub async fn select_folder(&self, path: &Path) -> AppResult<FolderHandle> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error("folder", &path.to_string_lossy(), e))?;
        if !metadata.is_dir() {
            return Err(AppError::InvalidSelection(format!("{} is not a directory", path.display())));
        }

        let path = tokio::fs::canonicalize(path).await?;
        let handle = FolderHandle::new(path);
        kv::save(self.store.as_ref(), Partition::Handles, FOLDER_HANDLE_KEY, &handle).await?;

        tracing::info!("Recordings folder set to {:?}", handle.path);
        *self.folder.write() = Some(handle.clone());
        self.recordings.write().clear();
        Ok(handle)
    }

    /// Forget the chosen folder
    pub async fn clear_folder(&self) -> AppResult<()> {
        self.store.delete(Partition::Handles, FOLDER_HANDLE_KEY).await?;
        *self.folder.write() = None;
        self.recordings.write().clear();
        Ok(())
    }

    /// Re-check access to the folder after the user acted on it
    pub async fn request_permission(&self) -> PermissionState {
        let state = self.permission_state().await;
        tracing::debug!("Folder permission: {:?}", state);
        state
    }

    /// Last listing produced by `refresh_recordings`
    pub fn recordings(&self) -> Vec<RecordingFileSummary> {
        self.recordings.read().clone()
    }

    fn current_folder(&self) -> Option<PathBuf> {
        self.folder.read().as_ref().map(|h| h.path.clone())
    }

    fn folder_path(&self) -> AppResult<PathBuf> {
        self.current_folder()
            .ok_or_else(|| AppError::PersistenceFailed("no recordings folder selected".to_string()))
    }
}

#[async_trait]
impl PersistenceSink for FolderStorage {
    async fn folder_handle(&self) -> Option<FolderHandle> {
        self.folder.read().clone()
    }

    async fn permission_state(&self) -> PermissionState {
        let Some(path) = self.current_folder() else {
            return PermissionState::Unknown;
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return PermissionState::Denied,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return PermissionState::Denied,
            Err(_) => return PermissionState::Prompt,
        }

        // Mode bits say nothing about this process, so try an actual write.
        let check = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(".folder-recorder-")
                .tempfile_in(&path)
                .map(drop)
        })
        .await;

        match check {
            Ok(Ok(())) => PermissionState::Granted,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => PermissionState::Prompt,
            Ok(Err(e)) => {
                tracing::debug!("Recordings folder is not writable: {}", e);
                PermissionState::Denied
            }
            Err(e) => {
                tracing::warn!("Folder access check failed: {}", e);
                PermissionState::Unknown
            }
        }
    }

    async fn save_recording(&self, blob: &RecordingBlob, filename: &str) -> AppResult<()> {
        validate_filename(filename)?;
        let folder = self.folder_path()?;
        let path = folder.join(filename);

        tokio::fs::write(&path, &blob.bytes).await.map_err(|e| {
            let error = io_error("saving", filename, e);
            AppError::PersistenceFailed(error.to_string())
        })?;

        tracing::info!("Saved {} ({} bytes, {})", path.display(), blob.len(), blob.mime_type);
        Ok(())
    }

    async fn refresh_recordings(&self) -> AppResult<Vec<RecordingFileSummary>> {
        let folder = self.folder_path()?;
        let mut entries = tokio::fs::read_dir(&folder)
            .await
            .map_err(|e| io_error("listing", &folder.to_string_lossy(), e))?;

        let mut recordings = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if recording_extension(&name).is_none() {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    continue;
                }
            };

            let last_modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            recordings.push(RecordingFileSummary {
                mime_type: mime_type_for(&name).to_string(),
                name,
                size: metadata.len(),
                last_modified,
            });
        }

        recordings.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then_with(|| a.name.cmp(&b.name)));
        tracing::debug!("Found {} recordings in {:?}", recordings.len(), folder);

        *self.recordings.write() = recordings.clone();
        Ok(recordings)
    }

    async fn read_recording_file(&self, filename: &str) -> AppResult<RecordingFile> {
        validate_filename(filename)?;
        let folder = self.folder_path()?;
        let bytes = tokio::fs::read(folder.join(filename))
            .await
            .map_err(|e| io_error("reading", filename, e))?;

        Ok(RecordingFile {
            name: filename.to_string(),
            mime_type: mime_type_for(filename).to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn blob(bytes: &[u8]) -> RecordingBlob {
        RecordingBlob {
            bytes: bytes.to_vec(),
            mime_type: "video/webm".to_string(),
        }
    }

    async fn storage_in(dir: &Path) -> (FolderStorage, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let storage = FolderStorage::new(store.clone());
        storage.select_folder(dir).await.unwrap();
        (storage, store)
    }

    #[tokio::test]
    async fn test_no_folder_selected() {
        let storage = FolderStorage::new(Arc::new(MemoryStore::new()));
        assert_eq!(storage.permission_state().await, PermissionState::Unknown);
        assert!(storage.folder_handle().await.is_none());
        assert!(matches!(
            storage.save_recording(&blob(b"x"), "a.webm").await,
            Err(AppError::PersistenceFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_selected_folder_is_restored() {
        let dir = tempdir().unwrap();
        let (storage, store) = storage_in(dir.path()).await;
        assert_eq!(storage.permission_state().await, PermissionState::Granted);

        let reopened = FolderStorage::new(store);
        let handle = reopened.restore().await.unwrap();
        assert_eq!(handle, storage.folder_handle().await.unwrap());
    }

    #[tokio::test]
    async fn test_select_rejects_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let storage = FolderStorage::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            storage.select_folder(&file).await,
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_filters_and_orders_newest_first() {
        let dir = tempdir().unwrap();
        let (storage, _) = storage_in(dir.path()).await;

        storage.save_recording(&blob(b"old"), "old.webm").await.unwrap();
        storage.save_recording(&blob(b"newer"), "new.MP4").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.webm")).unwrap();

        let old_time = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(dir.path().join("old.webm"))
            .unwrap()
            .set_modified(old_time)
            .unwrap();

        let recordings = storage.refresh_recordings().await.unwrap();
        let names: Vec<_> = recordings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new.MP4", "old.webm"]);
        assert_eq!(recordings[0].mime_type, "video/mp4");
        assert_eq!(recordings[0].size, 5);
        assert_eq!(storage.recordings(), recordings);
    }

    #[tokio::test]
    async fn test_read_recording_file() {
        let dir = tempdir().unwrap();
        let (storage, _) = storage_in(dir.path()).await;
        storage.save_recording(&blob(b"data"), "clip.ogg").await.unwrap();

        let file = storage.read_recording_file("clip.ogg").await.unwrap();
        assert_eq!(file.bytes, b"data");
        assert_eq!(file.mime_type, "audio/ogg");

        assert!(matches!(
            storage.read_recording_file("missing.webm").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            storage.read_recording_file("../escape.webm").await,
            Err(AppError::InvalidSelection(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_folder_detected_on_next_access() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("recordings");
        std::fs::create_dir(&folder).unwrap();
        let (storage, _) = storage_in(&folder).await;

        std::fs::remove_dir_all(&folder).unwrap();

        assert_eq!(storage.permission_state().await, PermissionState::Prompt);
        assert!(matches!(
            storage.refresh_recordings().await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            storage.save_recording(&blob(b"x"), "a.webm").await,
            Err(AppError::PersistenceFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_access_check_leaves_no_files() {
        let dir = tempdir().unwrap();
        let (storage, _) = storage_in(dir.path()).await;

        assert_eq!(storage.permission_state().await, PermissionState::Granted);
        assert_eq!(storage.request_permission().await, PermissionState::Granted);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_folder_replaced_by_file_is_denied() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("recordings");
        std::fs::create_dir(&folder).unwrap();
        let (storage, _) = storage_in(&folder).await;

        std::fs::remove_dir(&folder).unwrap();
        std::fs::write(&folder, "not a folder").unwrap();

        assert_eq!(storage.permission_state().await, PermissionState::Denied);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unwritable_folder_is_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let folder = dir.path().join("locked");
        std::fs::create_dir(&folder).unwrap();
        let (storage, _) = storage_in(&folder).await;
        std::fs::set_permissions(&folder, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users write through mode bits; that still counts as granted.
        let writable = tempfile::tempfile_in(&folder).is_ok();
        let expected = if writable { PermissionState::Granted } else { PermissionState::Denied };
        assert_eq!(storage.permission_state().await, expected);

        std::fs::set_permissions(&folder, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_recording_extension() {
        assert_eq!(recording_extension("a.WebM").as_deref(), Some("webm"));
        assert_eq!(recording_extension("a.opus").as_deref(), Some("opus"));
        assert_eq!(recording_extension("a.txt"), None);
        assert_eq!(recording_extension("noext"), None);
    }
}
