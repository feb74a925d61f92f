//! Scriptable player engine for playback tests.
//!
//! Records every control call, holds seek completions until the test releases
//! them, and lets the test emit engine events through the registered sinks.

#![allow(dead_code)]

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    AssetDescriptor, EngineEvent, EngineEventSink, MediaHandle, MediaTime, ObservationToken,
    PlayerEngine, SeekCompletion, SeekResult, Size,
};
use core_library::Video;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct EngineState {
    calls: Vec<String>,
    loaded: Option<String>,
    fail_load: bool,
    rate: f32,
    time: MediaTime,
    steps: Vec<i32>,
    seeks: Vec<MediaTime>,
    pending_seeks: VecDeque<(MediaTime, SeekCompletion)>,
    periodic: Option<(ObservationToken, EngineEventSink)>,
    properties: Option<(ObservationToken, EngineEventSink)>,
    periodic_interval: Option<Duration>,
    removed: Vec<ObservationToken>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_load() -> Arc<Self> {
        let engine = Self::default();
        engine.state.lock().unwrap().fail_load = true;
        Arc::new(engine)
    }

    /// Deliver `event` through the sink a real engine would use.
    pub fn emit(&self, event: EngineEvent) {
        let sink = {
            let state = self.state.lock().unwrap();
            let slot = match event {
                EngineEvent::PeriodicTime { .. } => &state.periodic,
                _ => &state.properties,
            };
            slot.as_ref().map(|(_, sink)| Arc::clone(sink))
        };
        if let Some(sink) = sink {
            sink(event);
        }
    }

    /// Emit engine-ready and item-ready.
    pub fn become_ready(&self) {
        self.emit(EngineEvent::Status {
            status: bridge_traits::EngineStatus::ReadyToPlay,
        });
        self.emit(EngineEvent::ItemStatus {
            status: bridge_traits::ItemStatus::ReadyToPlay,
        });
    }

    /// Complete the oldest outstanding seek. Returns its target.
    pub fn complete_next_seek(&self, result: SeekResult) -> Option<MediaTime> {
        let (target, completion) = {
            let mut state = self.state.lock().unwrap();
            let (target, completion) = state.pending_seeks.pop_front()?;
            if result == SeekResult::Finished {
                state.time = target;
            }
            (target, completion)
        };
        completion(result);
        Some(target)
    }

    pub fn set_current_time(&self, time: MediaTime) {
        self.state.lock().unwrap().time = time;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn seeks(&self) -> Vec<MediaTime> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn pending_seek_count(&self) -> usize {
        self.state.lock().unwrap().pending_seeks.len()
    }

    pub fn steps(&self) -> Vec<i32> {
        self.state.lock().unwrap().steps.clone()
    }

    pub fn loaded(&self) -> Option<String> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn periodic_interval(&self) -> Option<Duration> {
        self.state.lock().unwrap().periodic_interval
    }

    pub fn removed_observers(&self) -> usize {
        self.state.lock().unwrap().removed.len()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
        self.emit(EngineEvent::Rate { rate });
    }
}

impl PlayerEngine for FakeEngine {
    fn load_looping(&self, media: &MediaHandle) -> Result<()> {
        self.record("load_looping");
        let mut state = self.state.lock().unwrap();
        if state.fail_load {
            return Err(BridgeError::OperationFailed("unsupported media".to_string()));
        }
        state.loaded = Some(media.id.clone());
        Ok(())
    }

    fn unload(&self) {
        self.record("unload");
        self.state.lock().unwrap().loaded = None;
    }

    fn play(&self) {
        self.record("play");
        self.set_rate(1.0);
    }

    fn pause(&self) {
        self.record("pause");
        if self.state.lock().unwrap().rate != 0.0 {
            self.set_rate(0.0);
        }
    }

    fn rate(&self) -> f32 {
        self.state.lock().unwrap().rate
    }

    fn current_time(&self) -> MediaTime {
        self.state.lock().unwrap().time
    }

    fn step_by_count(&self, count: i32) {
        self.record(format!("step({})", count));
        self.state.lock().unwrap().steps.push(count);
    }

    fn seek(&self, to: MediaTime, completion: SeekCompletion) {
        self.record("seek");
        let mut state = self.state.lock().unwrap();
        state.seeks.push(to);
        state.pending_seeks.push_back((to, completion));
    }

    fn add_periodic_time_observer(
        &self,
        interval: Duration,
        sink: EngineEventSink,
    ) -> ObservationToken {
        self.record("add_periodic_time_observer");
        let token = ObservationToken::new();
        let mut state = self.state.lock().unwrap();
        state.periodic = Some((token, sink));
        state.periodic_interval = Some(interval);
        token
    }

    fn add_property_observer(&self, sink: EngineEventSink) -> ObservationToken {
        self.record("add_property_observer");
        let token = ObservationToken::new();
        self.state.lock().unwrap().properties = Some((token, sink));
        token
    }

    fn remove_observer(&self, token: ObservationToken) {
        self.record("remove_observer");
        let mut state = self.state.lock().unwrap();
        state.removed.push(token);
        if state.periodic.as_ref().map(|(t, _)| *t) == Some(token) {
            state.periodic = None;
        }
        if state.properties.as_ref().map(|(t, _)| *t) == Some(token) {
            state.properties = None;
        }
    }
}

pub fn sample_video() -> Arc<Video> {
    let asset = AssetDescriptor::new("asset-1", 1920, 1080);
    let media = MediaHandle::new("file:///clip.mov")
        .with_video_track(Size::new(1920.0, 1080.0), 30.0)
        .with_duration(MediaTime::from_seconds(10.0));
    Arc::new(Video::new(asset, media))
}

pub fn seconds(value: f64) -> MediaTime {
    MediaTime::from_seconds(value)
}
