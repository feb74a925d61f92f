//! Batched frame extraction.
//!
//! A [`FrameExtractor`] owns one host generator bound to one video. Every
//! request is a batch of times; the generator answers once per time from its
//! own threads, the answers are queued, and [`FrameExtractor::pump`] folds them
//! into exactly one [`FramesOutcome`] per batch.
//!
//! Thumbnail and export extraction use separate extractors so cancelling an
//! export never touches thumbnail work.
//!
//! A thumbnail outcome carries frames, not positions. The index a thumbnail
//! lands at comes from [`ThumbnailCollection::insert`](crate::ThumbnailCollection::insert)
//! once the outcome is applied, since only the collection knows the current order.

use crate::error::{FrameError, Result};
use crate::frame::{Frame, MetadataImage};
use crate::geometry;
use bridge_traits::{
    FrameGenerator, FrameGeneratorFactory, GeneratedFrame, GenerationRequest, GenerationStatus,
    ImageMetadata, MediaTime, Size,
};
use core_library::Video;
use core_runtime::dispatch::{CoordinationQueue, CoordinationSignal};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Identifies one batch request on its extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// What a batch was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Single display-sized frame without metadata.
    Thumbnail,
    /// Full-resolution frames carrying the video's metadata.
    Export,
}

/// Final result of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FramesOutcome {
    Cancelled,
    Failed { reason: String },
    /// One frame per requested time, in completion order.
    Succeeded(Vec<Frame>),
}

/// A resolved batch, as returned by [`FrameExtractor::pump`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub id: BatchId,
    pub kind: BatchKind,
    pub outcome: FramesOutcome,
}

struct GeneratorMessage {
    batch: BatchId,
    frame: GeneratedFrame,
}

enum Progress {
    Pending(BatchAggregator),
    Resolved(FramesOutcome),
}

/// Collects per-time results for one batch.
///
/// `accept` consumes the aggregator and only hands it back while the batch is
/// still open, so a resolved batch cannot accept anything else.
struct BatchAggregator {
    kind: BatchKind,
    expected: usize,
    metadata: Option<ImageMetadata>,
    frames: Vec<Frame>,
}

impl BatchAggregator {
    fn new(kind: BatchKind, expected: usize, metadata: Option<ImageMetadata>) -> Self {
        Self {
            kind,
            expected,
            metadata,
            frames: Vec::with_capacity(expected),
        }
    }

    fn accept(mut self, generated: GeneratedFrame) -> Progress {
        match (generated.status, generated.image) {
            (GenerationStatus::Cancelled, _) => Progress::Resolved(FramesOutcome::Cancelled),
            (GenerationStatus::Succeeded, Some(image)) => {
                self.frames.push(Frame::new(
                    generated.requested_time,
                    generated.actual_time,
                    MetadataImage::new(image, self.metadata.clone()),
                ));
                if self.frames.len() >= self.expected {
                    Progress::Resolved(FramesOutcome::Succeeded(self.frames))
                } else {
                    Progress::Pending(self)
                }
            }
            (GenerationStatus::Succeeded, None) => Progress::Resolved(FramesOutcome::Failed {
                reason: format!(
                    "generator returned no image for {}",
                    generated.requested_time
                ),
            }),
            (GenerationStatus::Failed, _) => Progress::Resolved(FramesOutcome::Failed {
                reason: generated
                    .error
                    .unwrap_or_else(|| format!("generation failed at {}", generated.requested_time)),
            }),
        }
    }
}

/// Issues frame batches against one generator and aggregates their results.
pub struct FrameExtractor {
    video: Arc<Video>,
    generator: Arc<dyn FrameGenerator>,
    queue: CoordinationQueue<GeneratorMessage>,
    pending: HashMap<BatchId, BatchAggregator>,
    resolved: Vec<BatchOutcome>,
    thumbnail_size: Size,
    next_batch: u64,
    torn_down: bool,
}

impl FrameExtractor {
    /// Create an extractor with a fresh generator for `video`.
    pub fn new(
        video: Arc<Video>,
        factory: &dyn FrameGeneratorFactory,
        signal: CoordinationSignal,
    ) -> Result<Self> {
        let generator = factory.make_generator(video.media())?;
        debug!(video = %video.id(), "Frame generator created");

        Ok(Self {
            video,
            generator,
            queue: CoordinationQueue::with_signal(signal),
            pending: HashMap::new(),
            resolved: Vec::new(),
            thumbnail_size: Size::ZERO,
            next_batch: 0,
            torn_down: false,
        })
    }

    /// Size thumbnails for cells of `display_size` points at `screen_scale`.
    pub fn with_thumbnail_target(mut self, display_size: Size, screen_scale: f64) -> Self {
        self.set_thumbnail_target(display_size, screen_scale);
        self
    }

    pub fn set_thumbnail_target(&mut self, display_size: Size, screen_scale: f64) {
        self.thumbnail_size =
            geometry::thumbnail_size(self.video.pixel_size(), display_size, screen_scale);
    }

    /// Generator bound for thumbnails, in pixels. Zero means unbounded.
    pub fn thumbnail_size(&self) -> Size {
        self.thumbnail_size
    }

    pub fn video(&self) -> &Arc<Video> {
        &self.video
    }

    /// Request one thumbnail-sized frame at `time`.
    pub fn request_thumbnail(&mut self, time: MediaTime) -> Result<BatchId> {
        let maximum_size = Some(self.thumbnail_size).filter(|size| !size.is_empty());
        self.submit(
            BatchKind::Thumbnail,
            GenerationRequest::exact(vec![time], maximum_size),
            None,
        )
    }

    /// Request full-resolution frames with metadata for every time in `times`.
    pub fn request_export_batch(&mut self, times: Vec<MediaTime>) -> Result<BatchId> {
        let metadata = Some(self.video.metadata());
        self.submit(
            BatchKind::Export,
            GenerationRequest::exact(times, None),
            metadata,
        )
    }

    fn submit(
        &mut self,
        kind: BatchKind,
        request: GenerationRequest,
        metadata: Option<ImageMetadata>,
    ) -> Result<BatchId> {
        if self.torn_down {
            return Err(FrameError::TornDown);
        }

        let id = BatchId(self.next_batch);
        self.next_batch += 1;

        if request.times.is_empty() {
            self.resolved.push(BatchOutcome {
                id,
                kind,
                outcome: FramesOutcome::Succeeded(Vec::new()),
            });
            return Ok(id);
        }

        debug!(batch = %id, ?kind, times = request.times.len(), "Requesting frames");
        self.pending.insert(
            id,
            BatchAggregator::new(kind, request.times.len(), metadata),
        );

        let handle = self.queue.handle();
        self.generator.generate_frames(
            request,
            Arc::new(move |frame| {
                // The extractor is gone; nothing is waiting for this result
                let _ = handle.post(GeneratorMessage { batch: id, frame });
            }),
        );
        Ok(id)
    }

    /// Fold queued generator results into batch outcomes.
    ///
    /// Each batch appears exactly once across all calls. Results for batches
    /// that already resolved are dropped.
    pub fn pump(&mut self) -> Vec<BatchOutcome> {
        let mut outcomes = std::mem::take(&mut self.resolved);

        for GeneratorMessage { batch, frame } in self.queue.drain() {
            let Some(aggregator) = self.pending.remove(&batch) else {
                trace!(batch = %batch, status = ?frame.status, "Ignoring late frame result");
                continue;
            };

            let kind = aggregator.kind;
            match aggregator.accept(frame) {
                Progress::Pending(aggregator) => {
                    self.pending.insert(batch, aggregator);
                }
                Progress::Resolved(outcome) => {
                    match &outcome {
                        FramesOutcome::Failed { reason } => {
                            warn!(batch = %batch, ?kind, %reason, "Frame batch failed")
                        }
                        FramesOutcome::Cancelled => debug!(batch = %batch, "Frame batch cancelled"),
                        FramesOutcome::Succeeded(frames) => {
                            debug!(batch = %batch, frames = frames.len(), "Frame batch complete")
                        }
                    }
                    outcomes.push(BatchOutcome {
                        id: batch,
                        kind,
                        outcome,
                    });
                }
            }
        }

        outcomes
    }

    /// Number of batches still waiting on the generator.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: BatchId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Cancel all in-flight generation. Open batches resolve as cancelled on
    /// the next pump.
    pub fn cancel_all(&self) {
        if !self.pending.is_empty() {
            debug!(video = %self.video.id(), batches = self.pending.len(), "Cancelling frame generation");
        }
        self.generator.cancel_all();
    }

    /// Cancel everything and refuse further requests. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.cancel_all();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for FrameExtractor {
    fn drop(&mut self) {
        self.teardown();
    }
}
