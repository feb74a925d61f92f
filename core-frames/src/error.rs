//! # Frame Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur while extracting or managing frames.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The host could not create a generator for the video.
    #[error("Frame generator unavailable: {0}")]
    Generator(#[from] BridgeError),

    /// An index outside the collection was used.
    #[error("Index {index} out of bounds for {len} thumbnails")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Encoding a frame for export failed.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Request issued after the extractor was torn down.
    #[error("Frame extractor torn down")]
    TornDown,
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_message() {
        let err = FrameError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Index 4 out of bounds for 2 thumbnails");
    }

    #[test]
    fn test_bridge_error_converts() {
        let err: FrameError = BridgeError::NotAvailable("generator".to_string()).into();
        assert!(matches!(err, FrameError::Generator(_)));
    }
}
