//! # Session Notifications
//!
//! Typed events the core publishes so a presentation layer can re-render
//! without the core knowing about views. Publishing goes through a
//! `tokio::sync::broadcast` channel ([`EventBus`]); consumers either hold a raw
//! [`Receiver`] or an [`EventStream`] that filters for them.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(CoreEvent::Session(SessionEvent::ThumbnailsChanged { count: 1 }))
//!     .ok();
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.description(), "Thumbnail collection changed");
//! # }
//! ```
//!
//! A slow subscriber sees `RecvError::Lagged(n)` and keeps receiving newer
//! events. Times are whole milliseconds so events stay `Eq`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback lifecycle events
    Playback(PlaybackEvent),
    /// Frame extraction and export events
    Frames(FramesEvent),
    /// Session state (collection, selection, loading)
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Frames(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Frames(FramesEvent::ExportFailed { .. }) => EventSeverity::Error,
            CoreEvent::Frames(FramesEvent::ThumbnailFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::ReadyToPlay) => EventSeverity::Info,
            CoreEvent::Frames(FramesEvent::ExportCompleted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events describing the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum PlaybackEvent {
    /// Engine and item became ready together for the first time.
    ReadyToPlay,
    /// The coordinator moved to a new playback state.
    StateChanged {
        /// Lower-case state label (`idle`, `ready_to_play`, `playing`, `paused`, `failed`)
        state: String,
    },
    /// Playback failed. `fatal` failures (engine or item) end the session.
    Failed { message: String, fatal: bool },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::ReadyToPlay => "Video ready to play",
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Failed { .. } => "Playback failed",
        }
    }
}

// ============================================================================
// Frame Events
// ============================================================================

/// Events produced by thumbnail and export extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum FramesEvent {
    /// A thumbnail was inserted into the collection.
    ThumbnailAdded { index: usize, time_ms: i64 },
    /// A thumbnail was removed from the collection.
    ThumbnailRemoved { index: usize },
    /// Thumbnail generation failed for the requested time.
    ThumbnailFailed { time_ms: i64, message: String },
    /// An export batch produced all of its frames.
    ExportCompleted { count: usize },
    /// An export batch failed. Cancelled exports produce no event.
    ExportFailed { message: String },
}

impl FramesEvent {
    fn description(&self) -> &str {
        match self {
            FramesEvent::ThumbnailAdded { .. } => "Thumbnail added",
            FramesEvent::ThumbnailRemoved { .. } => "Thumbnail removed",
            FramesEvent::ThumbnailFailed { .. } => "Thumbnail generation failed",
            FramesEvent::ExportCompleted { .. } => "Export completed",
            FramesEvent::ExportFailed { .. } => "Export failed",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Selection and collection notifications for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum SessionEvent {
    /// The thumbnail collection changed; `count` is its new length.
    ThumbnailsChanged { count: usize },
    /// The highlighted thumbnail changed.
    SelectionChanged { index: Option<usize> },
    /// Video download progress.
    VideoLoadProgress { percent: u8 },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::ThumbnailsChanged { .. } => "Thumbnail collection changed",
            SessionEvent::SelectionChanged { .. } => "Selection changed",
            SessionEvent::VideoLoadProgress { .. } => "Video loading",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Cloning the bus is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let frames_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Frames(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()` and `try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumbnails_changed(count: usize) -> CoreEvent {
        CoreEvent::Session(SessionEvent::ThumbnailsChanged { count })
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(thumbnails_changed(0)).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_each_event() {
        let bus = EventBus::new(4);
        let mut presenter = bus.subscribe();
        let mut recorder = bus.clone().subscribe();

        let added = CoreEvent::Frames(FramesEvent::ThumbnailAdded {
            index: 2,
            time_ms: 1500,
        });
        assert_eq!(bus.emit(added.clone()).unwrap(), 2);

        assert_eq!(presenter.recv().await.unwrap(), added);
        assert_eq!(recorder.recv().await.unwrap(), added);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut receiver = bus.subscribe();
        bus.emit(thumbnails_changed(1)).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), thumbnails_changed(1));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();

        for percent in [0u8, 25, 50, 75, 100] {
            bus.emit(CoreEvent::Session(SessionEvent::VideoLoadProgress { percent }))
                .ok();
        }

        assert!(matches!(receiver.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(
            receiver.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::VideoLoadProgress { percent: 75 })
        );
    }

    #[tokio::test]
    async fn test_stream_filter_skips_other_categories() {
        let bus = EventBus::new(8);
        let mut frames_only =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Frames(_)));

        bus.emit(thumbnails_changed(3)).ok();
        let export = CoreEvent::Frames(FramesEvent::ExportCompleted { count: 3 });
        bus.emit(export.clone()).ok();

        assert_eq!(frames_only.recv().await.unwrap(), export);
        assert!(frames_only.try_recv().is_none());
    }

    #[test]
    fn test_try_recv_by_severity() {
        let bus = EventBus::new(8);
        let mut errors = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() >= EventSeverity::Error);

        bus.emit(thumbnails_changed(1)).ok();
        let failure = CoreEvent::Frames(FramesEvent::ExportFailed {
            message: "generator failed".to_string(),
        });
        bus.emit(failure.clone()).ok();

        assert_eq!(errors.try_recv().unwrap().unwrap(), failure);
        assert!(errors.try_recv().is_none());
    }

    #[test]
    fn test_severity_follows_user_visibility() {
        let fatal = CoreEvent::Playback(PlaybackEvent::Failed {
            message: "decoder crashed".to_string(),
            fatal: true,
        });
        let thumbnail = CoreEvent::Frames(FramesEvent::ThumbnailFailed {
            time_ms: 10,
            message: "no image".to_string(),
        });
        let selection = CoreEvent::Session(SessionEvent::SelectionChanged { index: Some(0) });

        assert_eq!(fatal.severity(), EventSeverity::Error);
        assert_eq!(thumbnail.severity(), EventSeverity::Warning);
        assert_eq!(
            CoreEvent::Playback(PlaybackEvent::ReadyToPlay).severity(),
            EventSeverity::Info
        );
        assert_eq!(selection.severity(), EventSeverity::Debug);
        assert_eq!(thumbnail.description(), "Thumbnail generation failed");
    }

    #[test]
    fn test_wire_format() {
        let event = CoreEvent::Playback(PlaybackEvent::StateChanged {
            state: "paused".to_string(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Playback",
                "payload": { "kind": "StateChanged", "state": "paused" }
            })
        );
        assert_eq!(serde_json::from_value::<CoreEvent>(json).unwrap(), event);
    }
}
