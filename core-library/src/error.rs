use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Media fetch failed for asset {asset_id}: {message}")]
    FetchFailed { asset_id: String, message: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl LibraryError {
    /// Cancellation is expected and never user-visible.
    pub fn is_cancelled(&self) -> bool {
        match self {
            LibraryError::Cancelled => true,
            LibraryError::Bridge(err) => err.is_cancelled(),
            _ => false,
        }
    }

    /// A failed fetch may be re-issued while the video is not loaded yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            LibraryError::FetchFailed { .. } => true,
            LibraryError::Bridge(err) => !err.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
