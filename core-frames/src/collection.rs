//! The frames a user picked during a session, kept sorted by actual time.

use crate::error::{FrameError, Result};
use crate::frame::Frame;
use bridge_traits::MediaTime;
use tracing::error;

/// Ordered frames, ascending by [`Frame::actual_time`].
///
/// Frames with equal times keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCollection {
    frames: Vec<Frame>,
}

impl ThumbnailCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a frame at `time` would be inserted at: before the first frame
    /// with a later time.
    pub fn insertion_index(&self, time: MediaTime) -> usize {
        self.frames.partition_point(|frame| frame.actual_time <= time)
    }

    /// Insert `frame` in order and return its index.
    pub fn insert(&mut self, frame: Frame) -> usize {
        let index = self.insertion_index(frame.actual_time);
        self.frames.insert(index, frame);
        index
    }

    /// Remove the frame at `index`.
    ///
    /// An out-of-bounds index is a caller bug: it is logged, nothing changes,
    /// and [`FrameError::IndexOutOfBounds`] is returned.
    pub fn remove(&mut self, index: usize) -> Result<Frame> {
        if index >= self.frames.len() {
            let len = self.frames.len();
            error!(index, len, "Attempted to remove a thumbnail that does not exist");
            return Err(FrameError::IndexOutOfBounds { index, len });
        }
        Ok(self.frames.remove(index))
    }

    /// Frame for the highlighted `selected` index, clamped to the last frame
    /// when the index ran past the end.
    pub fn nearest_selected(&self, selected: Option<usize>) -> Option<&Frame> {
        let index = selected?;
        let last = self.frames.len().checked_sub(1)?;
        self.frames.get(index.min(last))
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    pub fn actual_times(&self) -> Vec<MediaTime> {
        self.frames.iter().map(|frame| frame.actual_time).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl<'a> IntoIterator for &'a ThumbnailCollection {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
