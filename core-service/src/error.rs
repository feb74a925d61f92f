use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(#[from] core_runtime::Error),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Frame error: {0}")]
    Frames(#[from] core_frames::FrameError),

    #[error("Session torn down")]
    TornDown,
}

impl CoreError {
    /// Returns `true` if re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Library(err) if err.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
