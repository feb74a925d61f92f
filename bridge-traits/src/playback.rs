//! Playback bridge traits and supporting media types.
//!
//! These abstractions let the core drive a platform playback engine (for
//! example AVFoundation or a GStreamer pipeline) without knowing anything about
//! how it decodes or renders. The engine reports status changes and periodic
//! time ticks through an [`EngineEventSink`]; seeks complete through a
//! [`SeekCompletion`]. Both may be invoked from any engine thread.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default timescale used when converting from floating point seconds.
pub const DEFAULT_TIMESCALE: u32 = 600;

// ============================================================================
// Time & Geometry
// ============================================================================

/// Rational media timestamp (`value / timescale` seconds).
///
/// Comparison is exact across different timescales, so `1/2` equals `300/600`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaTime {
    value: i64,
    timescale: u32,
}

impl MediaTime {
    /// The start of the timeline.
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    /// Create a time of `value / timescale` seconds. A zero timescale is
    /// treated as `1`.
    pub const fn new(value: i64, timescale: u32) -> Self {
        Self {
            value,
            timescale: if timescale == 0 { 1 } else { timescale },
        }
    }

    /// Convert seconds to a media time using [`DEFAULT_TIMESCALE`].
    pub fn from_seconds(seconds: f64) -> Self {
        Self::from_seconds_with_timescale(seconds, DEFAULT_TIMESCALE)
    }

    /// Convert seconds to a media time with an explicit timescale.
    pub fn from_seconds_with_timescale(seconds: f64, timescale: u32) -> Self {
        let timescale = timescale.max(1);
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self::new(millis, 1000)
    }

    pub const fn value(&self) -> i64 {
        self.value
    }

    pub const fn timescale(&self) -> u32 {
        self.timescale
    }

    pub fn as_seconds(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// Rounded to the nearest millisecond.
    pub fn as_millis(&self) -> i64 {
        let scaled = self.value as i128 * 1000;
        let timescale = self.timescale as i128;
        let rounded = if scaled >= 0 {
            (scaled + timescale / 2) / timescale
        } else {
            (scaled - timescale / 2) / timescale
        };
        rounded as i64
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl From<Duration> for MediaTime {
    fn from(duration: Duration) -> Self {
        Self::new(duration.as_micros() as i64, 1_000_000)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_seconds())
    }
}

/// Width and height, in pixels or points depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ============================================================================
// Engine Status
// ============================================================================

/// Status of the playback engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Status of the item currently attached to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Whether the engine is paused, playing, or waiting for media to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeControlStatus {
    Paused,
    WaitingToPlayAtSpecifiedRate,
    Playing,
}

/// Why the engine is waiting to play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingReason {
    ToMinimizeStalls,
    EvaluatingBufferingRate,
    NoItemToPlay,
    Other(String),
}

/// A track of the current item as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub track_id: i32,
    pub media_type: String,
    pub enabled: bool,
    /// Nominal frame rate for video tracks.
    pub nominal_frame_rate: Option<f32>,
}

/// Upstream notification emitted by a [`PlayerEngine`].
///
/// Player-level events describe the engine, item-level events describe the
/// item currently attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    // Player-level
    Status { status: EngineStatus },
    Rate { rate: f32 },
    TimeControlStatus { status: TimeControlStatus },
    WaitingReason { reason: Option<WaitingReason> },
    CurrentItemChanged { item_id: Option<String> },
    PeriodicTime { time: MediaTime },
    // Item-level
    ItemStatus { status: ItemStatus },
    ItemDuration { duration: MediaTime },
    ItemPresentationSize { size: Size },
    ItemTracks { tracks: Vec<TrackInfo> },
}

impl EngineEvent {
    /// Returns `true` for events describing the current item rather than the engine.
    pub fn is_item_event(&self) -> bool {
        matches!(
            self,
            EngineEvent::ItemStatus { .. }
                | EngineEvent::ItemDuration { .. }
                | EngineEvent::ItemPresentationSize { .. }
                | EngineEvent::ItemTracks { .. }
        )
    }
}

/// Result of a single seek operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekResult {
    /// The play head reached the requested time.
    Finished,
    /// The engine abandoned the seek (e.g. another seek started).
    Interrupted,
    /// The engine could not seek.
    Failed(String),
}

/// Identifies an observer registration on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationToken(Uuid);

impl ObservationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObservationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives engine events. May be called from any thread.
pub type EngineEventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Invoked exactly once when a seek ends. May be called from any thread.
pub type SeekCompletion = Box<dyn FnOnce(SeekResult) + Send>;

// ============================================================================
// Engine Trait
// ============================================================================

/// Platform playback engine driving one looping item.
///
/// Control calls are fire-and-forget: their effects are reported back through
/// the observers registered with [`add_property_observer`] and
/// [`add_periodic_time_observer`].
///
/// [`add_property_observer`]: PlayerEngine::add_property_observer
/// [`add_periodic_time_observer`]: PlayerEngine::add_periodic_time_observer
pub trait PlayerEngine: Send + Sync {
    /// Attach `media` and loop it indefinitely.
    fn load_looping(&self, media: &crate::media::MediaHandle) -> Result<()>;

    /// Detach the current item and release engine resources.
    fn unload(&self);

    fn play(&self);

    fn pause(&self);

    /// Current playback rate; `0.0` when paused.
    fn rate(&self) -> f32;

    fn current_time(&self) -> MediaTime;

    /// Step the current item by `count` frames (negative steps backwards).
    fn step_by_count(&self, count: i32);

    /// Seek with zero tolerance. `completion` fires exactly once.
    fn seek(&self, to: MediaTime, completion: SeekCompletion);

    /// Deliver [`EngineEvent::PeriodicTime`] every `interval` of playback.
    fn add_periodic_time_observer(
        &self,
        interval: Duration,
        sink: EngineEventSink,
    ) -> ObservationToken;

    /// Deliver every non-periodic [`EngineEvent`].
    fn add_property_observer(&self, sink: EngineEventSink) -> ObservationToken;

    /// Stop delivering events for `token`. Unknown tokens are ignored.
    fn remove_observer(&self, token: ObservationToken);
}
