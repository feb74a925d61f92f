//! # Playback Error Types

use bridge_traits::error::BridgeError;
use bridge_traits::MediaTime;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The engine refused to load the video.
    #[error("Failed to load video: {0}")]
    LoadFailed(#[from] BridgeError),

    /// The player engine reported a failed status.
    #[error("Player engine failed: {0}")]
    EngineFailed(String),

    /// The current item reported a failed status.
    #[error("Player item failed: {0}")]
    ItemFailed(String),

    /// The engine could not complete a seek.
    #[error("Seek to {target} failed: {message}")]
    SeekFailed { target: MediaTime, message: String },
}

impl PlaybackError {
    /// Returns `true` if the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::EngineFailed(_)
                | PlaybackError::ItemFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
