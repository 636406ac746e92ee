//! Recording folder access
//!
//! This module handles the folder recordings are written to:
//! - PersistenceSink: what the recording session needs from storage
//! - FolderStorage: filesystem implementation remembering the chosen folder
//! - Playback URLs for in-app playback of saved recordings

pub mod playback;
pub mod sink;

pub use playback::{PlaybackController, PlaybackUrls};
pub use sink::{
    FolderHandle, FolderStorage, PersistenceSink, RecordingFile, RecordingFileSummary, RECORDING_EXTENSIONS,
};
