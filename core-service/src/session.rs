//! # Session Orchestrator
//!
//! Turns user intents into calls on playback and frame extraction, and
//! reports what changed through the [`EventBus`].
//!
//! One session owns everything for one video: the playback coordinator, a
//! thumbnail extractor, an export extractor and the thumbnail collection. All
//! of it lives on the coordination thread; hosts call [`SessionOrchestrator::pump`]
//! whenever [`SessionOrchestrator::next_activity`] resolves.

use crate::error::{CoreError, Result};
use bridge_traits::{ImageEncoder, MediaTime};
use core_frames::{
    BatchId, BatchKind, BatchOutcome, ExportItem, Frame, FrameError, FrameExtractor,
    FramesOutcome, ThumbnailCollection,
};
use core_library::Video;
use core_playback::{PlaybackCoordinator, PlaybackNotice};
use core_runtime::config::{CoreConfig, SessionSettings};
use core_runtime::dispatch::CoordinationSignal;
use core_runtime::events::{CoreEvent, EventBus, FramesEvent, PlaybackEvent, SessionEvent};
use core_runtime::logging::coarse_location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Options for one export, read once when the export starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub include_metadata: bool,
}

impl ExportOptions {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    /// Options seeded from the session settings.
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.include_metadata)
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Result of an export, handed to the export reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Cancelled,
    Failed { reason: String },
    /// One item per frame, ordered by time.
    Succeeded(Vec<ExportItem>),
}

/// Continuation receiving an export's outcome on the coordination thread.
pub type ExportReply = Box<dyn FnOnce(ExportOutcome)>;

struct PendingExport {
    options: ExportOptions,
    reply: ExportReply,
}

/// Top-level controller for one loaded video.
pub struct SessionOrchestrator {
    video: Arc<Video>,
    playback: PlaybackCoordinator,
    thumbnails: FrameExtractor,
    exports: FrameExtractor,
    collection: ThumbnailCollection,
    selected: Option<usize>,
    pending_thumbnails: HashMap<BatchId, MediaTime>,
    pending_exports: HashMap<BatchId, PendingExport>,
    encoder: Arc<dyn ImageEncoder>,
    settings: SessionSettings,
    events: EventBus,
    signal: CoordinationSignal,
    torn_down: bool,
}

impl SessionOrchestrator {
    /// Start playback of `video` and prepare frame extraction for it.
    pub fn new(
        video: Arc<Video>,
        config: &CoreConfig,
        encoder: Arc<dyn ImageEncoder>,
        events: EventBus,
    ) -> Result<Self> {
        let settings = config.settings.clone();
        let signal = CoordinationSignal::new();

        let playback = PlaybackCoordinator::new(
            Arc::clone(&video),
            Arc::clone(&config.player_engine),
            settings.periodic_interval(),
            signal.clone(),
        )?;

        let factory = config.frame_generator_factory.as_ref();
        let thumbnails = FrameExtractor::new(Arc::clone(&video), factory, signal.clone())?
            .with_thumbnail_target(settings.thumbnail_display_size, settings.screen_scale);
        let exports = FrameExtractor::new(Arc::clone(&video), factory, signal.clone())?;

        info!(
            video = %video.id(),
            thumbnail_size = ?thumbnails.thumbnail_size(),
            "Session opened"
        );

        Ok(Self {
            video,
            playback,
            thumbnails,
            exports,
            collection: ThumbnailCollection::new(),
            selected: None,
            pending_thumbnails: HashMap::new(),
            pending_exports: HashMap::new(),
            encoder,
            settings,
            events,
            signal,
            torn_down: false,
        })
    }

    pub fn video(&self) -> &Arc<Video> {
        &self.video
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    /// Observers and direct transport access. Prefer the session's own
    /// transport intents, which also clear the highlighted thumbnail.
    pub fn playback_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.playback
    }

    pub fn thumbnails(&self) -> &ThumbnailCollection {
        &self.collection
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// The highlighted frame, if any.
    pub fn selected_frame(&self) -> Option<&Frame> {
        self.collection.nearest_selected(self.selected)
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Grab a thumbnail at the current play head. It is inserted into the
    /// collection when the generator delivers it.
    #[instrument(skip(self), fields(video = %self.video.id()))]
    pub fn add_current_frame(&mut self) -> Result<BatchId> {
        self.ensure_active()?;
        let time = self.playback.current_time();
        let id = self.thumbnails.request_thumbnail(time)?;
        self.pending_thumbnails.insert(id, time);
        debug!(batch = %id, time = %time, "Thumbnail requested");
        Ok(id)
    }

    /// Remove the thumbnail at `index`.
    #[instrument(skip(self))]
    pub fn remove_frame(&mut self, index: usize) -> Result<Frame> {
        self.ensure_active()?;
        let frame = self.collection.remove(index)?;

        let selected = match self.selected {
            Some(_) if self.collection.is_empty() => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(self.collection.len() - 1)),
            None => None,
        };

        self.emit(CoreEvent::Frames(FramesEvent::ThumbnailRemoved { index }));
        self.emit_thumbnails_changed();
        self.set_selection(selected);
        Ok(frame)
    }

    /// Highlight the thumbnail at `index` and move the play head to it.
    #[instrument(skip(self))]
    pub fn select_frame(&mut self, index: usize) -> Result<()> {
        self.ensure_active()?;
        let time = self
            .collection
            .get(index)
            .map(|frame| frame.actual_time)
            .ok_or_else(|| {
                let len = self.collection.len();
                error!(index, len, "Attempted to select a thumbnail that does not exist");
                FrameError::IndexOutOfBounds { index, len }
            })?;

        self.playback.pause();
        self.playback.cancel_pending_seeks();
        self.playback.smoothly_seek(time);
        self.set_selection(Some(index));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    /// Toggle between playing and paused. The highlight is cleared since the
    /// play head leaves the selected frame.
    pub fn play_or_pause(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.clear_selection();
        self.playback.play_or_pause();
        Ok(())
    }

    /// Pause and step `count` frames, clearing the highlight.
    pub fn step(&mut self, count: i32) -> Result<()> {
        self.ensure_active()?;
        self.clear_selection();
        self.playback.step(count);
        Ok(())
    }

    /// Move the play head while the user drags, clearing the highlight.
    pub fn scrub(&mut self, time: MediaTime) -> Result<()> {
        self.ensure_active()?;
        self.clear_selection();
        self.playback.smoothly_seek(time);
        Ok(())
    }

    /// Export every thumbnail at full resolution, or the current frame when
    /// there are none. `reply` receives the outcome exactly once.
    #[instrument(skip(self, reply), fields(video = %self.video.id()))]
    pub fn export_selection<F>(&mut self, options: ExportOptions, reply: F) -> Result<BatchId>
    where
        F: FnOnce(ExportOutcome) + 'static,
    {
        self.ensure_active()?;
        self.playback.pause();

        let times = if self.collection.is_empty() {
            vec![self.playback.current_time()]
        } else {
            self.collection.actual_times()
        };

        if options.include_metadata {
            if let Some(location) = self.video.asset().location {
                debug!(
                    location = %coarse_location(location.latitude, location.longitude),
                    "Exporting with location metadata"
                );
            }
        }

        let id = self.exports.request_export_batch(times)?;
        self.pending_exports.insert(
            id,
            PendingExport {
                options,
                reply: Box::new(reply),
            },
        );
        Ok(id)
    }

    /// Export with the options the session settings describe.
    pub fn export_selection_with_defaults<F>(&mut self, reply: F) -> Result<BatchId>
    where
        F: FnOnce(ExportOutcome) + 'static,
    {
        let options = ExportOptions::from_settings(&self.settings);
        self.export_selection(options, reply)
    }

    // ------------------------------------------------------------------
    // Coordination
    // ------------------------------------------------------------------

    /// Resolves when engine or generator callbacks are waiting to be pumped.
    pub async fn next_activity(&self) {
        self.signal.notified().await
    }

    /// Apply queued callbacks. Returns the events published by this call.
    ///
    /// A fatal playback failure ends the session: it is reported once and the
    /// session is torn down, so later intents return [`CoreError::TornDown`].
    pub fn pump(&mut self) -> Vec<CoreEvent> {
        let mut published = Vec::new();
        let mut fatal = false;

        for notice in self.playback.pump() {
            fatal |= matches!(&notice, PlaybackNotice::Failed(err) if err.is_fatal());
            published.push(self.playback_event(notice));
        }

        if fatal {
            self.teardown();
        } else {
            for outcome in self.thumbnails.pump() {
                published.extend(self.apply_thumbnail(outcome));
            }
            for outcome in self.exports.pump() {
                published.extend(self.apply_export(outcome));
            }
        }

        for event in &published {
            self.emit(event.clone());
        }
        published
    }

    /// Stop everything: cancel exports and thumbnails, stop playback and
    /// detach observation. Pending export replies receive `Cancelled`.
    /// Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!(video = %self.video.id(), "Tearing down session");

        self.exports.teardown();
        self.thumbnails.teardown();
        self.playback.teardown();

        self.pending_thumbnails.clear();
        for (_, pending) in self.pending_exports.drain() {
            (pending.reply)(ExportOutcome::Cancelled);
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.torn_down {
            Err(CoreError::TornDown)
        } else {
            Ok(())
        }
    }

    fn playback_event(&self, notice: PlaybackNotice) -> CoreEvent {
        let event = match notice {
            PlaybackNotice::BecameReady => PlaybackEvent::ReadyToPlay,
            PlaybackNotice::StateChanged(state) => PlaybackEvent::StateChanged {
                state: state.label().to_string(),
            },
            PlaybackNotice::Failed(err) => {
                let fatal = err.is_fatal();
                if fatal {
                    error!(error = %err, "Playback failed");
                } else {
                    warn!(error = %err, "Playback error");
                }
                PlaybackEvent::Failed {
                    message: err.to_string(),
                    fatal,
                }
            }
        };
        CoreEvent::Playback(event)
    }

    fn apply_thumbnail(&mut self, outcome: BatchOutcome) -> Vec<CoreEvent> {
        let requested = self.pending_thumbnails.remove(&outcome.id);
        let mut events = Vec::new();

        match outcome.outcome {
            FramesOutcome::Succeeded(frames) => {
                for frame in frames {
                    let time_ms = frame.actual_time.as_millis();
                    let index = self.collection.insert(frame);
                    events.push(CoreEvent::Frames(FramesEvent::ThumbnailAdded { index, time_ms }));
                    // Keep the highlight on the same frame
                    if let Some(selected) = self.selected.filter(|selected| *selected >= index) {
                        self.selected = Some(selected + 1);
                        events.push(CoreEvent::Session(SessionEvent::SelectionChanged {
                            index: self.selected,
                        }));
                    }
                }
                events.push(CoreEvent::Session(SessionEvent::ThumbnailsChanged {
                    count: self.collection.len(),
                }));
            }
            FramesOutcome::Failed { reason } => {
                let time_ms = requested.map(|time| time.as_millis()).unwrap_or_default();
                events.push(CoreEvent::Frames(FramesEvent::ThumbnailFailed {
                    time_ms,
                    message: reason,
                }));
            }
            FramesOutcome::Cancelled => {
                debug!(batch = %outcome.id, "Thumbnail cancelled");
            }
        }
        events
    }

    fn apply_export(&mut self, outcome: BatchOutcome) -> Vec<CoreEvent> {
        debug_assert_eq!(outcome.kind, BatchKind::Export);
        let Some(pending) = self.pending_exports.remove(&outcome.id) else {
            return Vec::new();
        };

        let (result, event) = match outcome.outcome {
            FramesOutcome::Succeeded(mut frames) => {
                frames.sort_by_key(|frame| frame.actual_time);
                let items: Vec<ExportItem> = frames
                    .iter()
                    .map(|frame| {
                        frame.export(
                            self.encoder.as_ref(),
                            pending.options.include_metadata,
                            self.settings.jpeg_quality,
                        )
                    })
                    .collect();
                info!(count = items.len(), "Export ready");
                let event = FramesEvent::ExportCompleted { count: items.len() };
                (ExportOutcome::Succeeded(items), Some(event))
            }
            FramesOutcome::Failed { reason } => {
                warn!(%reason, "Export failed");
                let event = FramesEvent::ExportFailed {
                    message: reason.clone(),
                };
                (ExportOutcome::Failed { reason }, Some(event))
            }
            FramesOutcome::Cancelled => (ExportOutcome::Cancelled, None),
        };

        (pending.reply)(result);
        event.map(CoreEvent::Frames).into_iter().collect()
    }

    fn set_selection(&mut self, selected: Option<usize>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        self.emit(CoreEvent::Session(SessionEvent::SelectionChanged { index: selected }));
    }

    fn emit_thumbnails_changed(&self) {
        self.emit(CoreEvent::Session(SessionEvent::ThumbnailsChanged {
            count: self.collection.len(),
        }));
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error for the session
        let _ = self.events.emit(event);
    }
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("video", &self.video.id())
            .field("state", &self.playback.state())
            .field("thumbnails", &self.collection.len())
            .field("selected", &self.selected)
            .field("pending_exports", &self.pending_exports.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}
