//! # Playback Coordinator
//!
//! Owns one looping playback session for one [`Video`]: the engine, the
//! [`TimeSeeker`] and the [`ObservationHub`].
//!
//! ## States
//!
//! ```text
//! Idle ──ready──> ReadyToPlay ──rate──> Playing <──> Paused
//!                      ^                    │          │
//!                      └──── loop boundary ─┴──────────┘
//! any ──engine or item failure──> Failed (terminal)
//! ```
//!
//! The state is derived from engine events. Readiness needs both the engine
//! and the current item to report ready; the item flag resets at every loop
//! boundary, so the one-time "became ready" notice goes through a
//! [`ReadinessLatch`].

use crate::error::{PlaybackError, Result};
use crate::observation::{ObservationHub, ObserverId, PlayerObserver};
use crate::seeker::{SeekReport, TimeSeeker};
use bridge_traits::{EngineEvent, EngineStatus, ItemStatus, MediaTime, PlayerEngine};
use core_library::Video;
use core_runtime::dispatch::CoordinationSignal;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Playback lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Idle,
    ReadyToPlay,
    Playing,
    Paused,
    Failed,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::ReadyToPlay => "ready_to_play",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fires once, the first time engine and item are ready together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessLatch {
    became_ready_once: bool,
}

impl ReadinessLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only on the first call where both flags are set.
    pub fn update(&mut self, engine_ready: bool, item_ready: bool) -> bool {
        if self.became_ready_once || !(engine_ready && item_ready) {
            return false;
        }
        self.became_ready_once = true;
        true
    }

    pub fn became_ready_once(&self) -> bool {
        self.became_ready_once
    }
}

/// Something the session owner should react to, produced by [`PlaybackCoordinator::pump`].
#[derive(Debug)]
pub enum PlaybackNotice {
    /// First time the video became ready to play.
    BecameReady,
    StateChanged(PlaybackState),
    /// Fatal errors end the session; seek failures do not.
    Failed(PlaybackError),
}

pub struct PlaybackCoordinator {
    video: Arc<Video>,
    engine: Arc<dyn PlayerEngine>,
    seeker: TimeSeeker,
    hub: ObservationHub,
    state: PlaybackState,
    engine_ready: bool,
    item_ready: bool,
    rate_observed: Option<f32>,
    latch: ReadinessLatch,
    torn_down: bool,
}

impl PlaybackCoordinator {
    /// Load `video` into `engine` for looping playback and start observing it.
    ///
    /// `tick_interval` is the periodic time observation interval; `signal` is
    /// woken whenever the engine posts an event or a seek completes.
    #[instrument(skip_all, fields(video_id = %video.id()))]
    pub fn new(
        video: Arc<Video>,
        engine: Arc<dyn PlayerEngine>,
        tick_interval: Duration,
        signal: CoordinationSignal,
    ) -> Result<Self> {
        engine.load_looping(video.media())?;

        let hub = ObservationHub::attach(Arc::clone(&engine), tick_interval, signal.clone());
        let seeker = TimeSeeker::new(Arc::clone(&engine), signal);

        info!("Playback session created");

        Ok(Self {
            video,
            engine,
            seeker,
            hub,
            state: PlaybackState::Idle,
            engine_ready: false,
            item_ready: false,
            rate_observed: None,
            latch: ReadinessLatch::new(),
            torn_down: false,
        })
    }

    pub fn video(&self) -> &Arc<Video> {
        &self.video
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    pub fn play(&self) {
        if self.is_inert() || self.is_playing() {
            return;
        }
        debug!("play");
        self.engine.play();
    }

    pub fn pause(&self) {
        if self.is_inert() || !self.is_playing() {
            return;
        }
        debug!("pause");
        self.engine.pause();
    }

    pub fn play_or_pause(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Pause, then step `count` frames (negative steps backwards).
    pub fn step(&self, count: i32) {
        if self.is_inert() {
            return;
        }
        self.pause();
        self.engine.step_by_count(count);
    }

    pub fn smoothly_seek(&mut self, time: MediaTime) {
        if self.is_inert() {
            return;
        }
        self.seeker.smoothly_seek(time);
    }

    pub fn cancel_pending_seeks(&mut self) {
        self.seeker.cancel_pending_seeks();
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    pub fn current_time(&self) -> MediaTime {
        self.engine.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.rate() != 0.0
    }

    /// Both the engine and the current item report ready.
    pub fn is_ready_to_play(&self) -> bool {
        self.engine_ready && self.item_ready
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn seeker(&self) -> &TimeSeeker {
        &self.seeker
    }

    pub fn seeker_mut(&mut self) -> &mut TimeSeeker {
        &mut self.seeker
    }

    pub fn hub(&self) -> &ObservationHub {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut ObservationHub {
        &mut self.hub
    }

    pub fn register_observer<O>(&mut self, observer: &Rc<O>) -> ObserverId
    where
        O: PlayerObserver + 'static,
    {
        self.hub.register(observer)
    }

    pub fn unregister_observer<O>(&mut self, observer: &Rc<O>) -> bool
    where
        O: PlayerObserver + 'static,
    {
        self.hub.unregister(observer)
    }

    // ------------------------------------------------------------------------
    // Coordination
    // ------------------------------------------------------------------------

    /// Apply seek completions and engine events posted since the last pump,
    /// delivering each event to the observers.
    pub fn pump(&mut self) -> Vec<PlaybackNotice> {
        let mut notices = Vec::new();
        if self.torn_down {
            return notices;
        }

        for report in self.seeker.pump() {
            if let SeekReport::Failed { target, message } = report {
                notices.push(PlaybackNotice::Failed(PlaybackError::SeekFailed {
                    target,
                    message,
                }));
            }
        }

        for event in self.hub.drain() {
            self.apply(&event, &mut notices);
            self.hub.deliver(&event);
        }

        notices
    }

    /// Pause, stop observing and release the engine's item. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.engine.pause();
        self.seeker.reset();
        self.hub.detach();
        self.engine.unload();

        info!(video_id = %self.video.id(), "Playback session torn down");
    }

    fn is_inert(&self) -> bool {
        self.torn_down || self.state == PlaybackState::Failed
    }

    fn apply(&mut self, event: &EngineEvent, notices: &mut Vec<PlaybackNotice>) {
        if self.state == PlaybackState::Failed {
            return;
        }

        match event {
            EngineEvent::Status { status } => match status {
                EngineStatus::ReadyToPlay => self.engine_ready = true,
                EngineStatus::Unknown => self.engine_ready = false,
                EngineStatus::Failed => {
                    return self.fail(PlaybackError::EngineFailed("engine status failed".into()), notices)
                }
            },
            EngineEvent::ItemStatus { status } => match status {
                ItemStatus::ReadyToPlay => self.item_ready = true,
                ItemStatus::Unknown => self.item_ready = false,
                ItemStatus::Failed => {
                    return self.fail(PlaybackError::ItemFailed("item status failed".into()), notices)
                }
            },
            EngineEvent::CurrentItemChanged { .. } => {
                // The looping engine swaps in a fresh item that has to resolve again
                self.item_ready = false;
            }
            EngineEvent::Rate { rate } => self.rate_observed = Some(*rate),
            _ => return,
        }

        if self.latch.update(self.engine_ready, self.item_ready) {
            info!("Video ready to play");
            notices.push(PlaybackNotice::BecameReady);
        }

        let next = self.derive_state();
        if next != self.state {
            debug!(from = %self.state, to = %next, "Playback state changed");
            self.state = next;
            notices.push(PlaybackNotice::StateChanged(next));
        }
    }

    fn derive_state(&self) -> PlaybackState {
        if !self.is_ready_to_play() {
            return if self.latch.became_ready_once() {
                PlaybackState::ReadyToPlay
            } else {
                PlaybackState::Idle
            };
        }

        match self.rate_observed {
            Some(rate) if rate != 0.0 => PlaybackState::Playing,
            Some(_) => PlaybackState::Paused,
            None => PlaybackState::ReadyToPlay,
        }
    }

    fn fail(&mut self, err: PlaybackError, notices: &mut Vec<PlaybackNotice>) {
        error!(error = %err, "Playback failed");
        self.state = PlaybackState::Failed;
        self.seeker.reset();
        notices.push(PlaybackNotice::StateChanged(PlaybackState::Failed));
        notices.push(PlaybackNotice::Failed(err));
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("video", &self.video.id())
            .field("state", &self.state)
            .field("engine_ready", &self.engine_ready)
            .field("item_ready", &self.item_ready)
            .field("seeker", &self.seeker)
            .field("hub", &self.hub)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
