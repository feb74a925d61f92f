//! Fake host backends for session tests.
//!
//! The engine completes seeks on demand and reports property changes through
//! the sinks the core registered. Every generator the factory hands out is
//! kept so tests can answer thumbnail and export requests separately.

#![allow(dead_code)]

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    AssetDescriptor, EngineEvent, EngineEventSink, EngineStatus, FrameGenerator,
    FrameGeneratorFactory, FrameHandler, FrameImage, GeneratedFrame, GenerationRequest,
    GeoLocation, ItemStatus, MediaHandle, MediaTime, ObservationToken, PlayerEngine,
    SeekCompletion, SeekResult, Size,
};
use chrono::{TimeZone, Utc};
use core_library::Video;
use core_runtime::config::CoreConfig;
use core_service::CoreService;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Engine
// ============================================================================

#[derive(Default)]
struct EngineState {
    calls: Vec<String>,
    loaded: bool,
    rate: f32,
    time: MediaTime,
    seeks: Vec<MediaTime>,
    pending_seeks: VecDeque<(MediaTime, SeekCompletion)>,
    periodic: Option<(ObservationToken, EngineEventSink)>,
    properties: Option<(ObservationToken, EngineEventSink)>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

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

    pub fn become_ready(&self) {
        self.emit(EngineEvent::Status {
            status: EngineStatus::ReadyToPlay,
        });
        self.emit(EngineEvent::ItemStatus {
            status: ItemStatus::ReadyToPlay,
        });
    }

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

    pub fn is_loaded(&self) -> bool {
        self.state.lock().unwrap().loaded
    }

    fn record(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }

    fn set_rate(&self, rate: f32) {
        self.state.lock().unwrap().rate = rate;
        self.emit(EngineEvent::Rate { rate });
    }
}

impl PlayerEngine for FakeEngine {
    fn load_looping(&self, _media: &MediaHandle) -> Result<()> {
        self.record("load_looping");
        self.state.lock().unwrap().loaded = true;
        Ok(())
    }

    fn unload(&self) {
        self.record("unload");
        self.state.lock().unwrap().loaded = false;
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

    fn step_by_count(&self, _count: i32) {
        self.record("step");
    }

    fn seek(&self, to: MediaTime, completion: SeekCompletion) {
        self.record("seek");
        let mut state = self.state.lock().unwrap();
        state.seeks.push(to);
        state.pending_seeks.push_back((to, completion));
    }

    fn add_periodic_time_observer(
        &self,
        _interval: Duration,
        sink: EngineEventSink,
    ) -> ObservationToken {
        let token = ObservationToken::new();
        self.state.lock().unwrap().periodic = Some((token, sink));
        token
    }

    fn add_property_observer(&self, sink: EngineEventSink) -> ObservationToken {
        let token = ObservationToken::new();
        self.state.lock().unwrap().properties = Some((token, sink));
        token
    }

    fn remove_observer(&self, token: ObservationToken) {
        self.record("remove_observer");
        let mut state = self.state.lock().unwrap();
        if state.periodic.as_ref().map(|(t, _)| *t) == Some(token) {
            state.periodic = None;
        }
        if state.properties.as_ref().map(|(t, _)| *t) == Some(token) {
            state.properties = None;
        }
    }
}

// ============================================================================
// Frame generation
// ============================================================================

#[derive(Default)]
struct GeneratorState {
    requests: Vec<GenerationRequest>,
    outstanding: Vec<(MediaTime, FrameHandler)>,
    cancel_calls: usize,
}

#[derive(Default)]
pub struct FakeGenerator {
    state: Mutex<GeneratorState>,
}

impl FakeGenerator {
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().unwrap().cancel_calls
    }

    /// Answer every outstanding time with a snapped image.
    pub fn succeed_all(&self, snap: impl Fn(MediaTime) -> MediaTime) {
        let outstanding = std::mem::take(&mut self.state.lock().unwrap().outstanding);
        for (time, handler) in outstanding {
            handler(GeneratedFrame::succeeded(time, snap(time), solid_image(8, 8)));
        }
    }

    pub fn fail_all(&self, message: &str) {
        let outstanding = std::mem::take(&mut self.state.lock().unwrap().outstanding);
        for (time, handler) in outstanding {
            handler(GeneratedFrame::failed(time, message));
        }
    }
}

impl FrameGenerator for FakeGenerator {
    fn generate_frames(&self, request: GenerationRequest, handler: FrameHandler) {
        let mut state = self.state.lock().unwrap();
        for time in &request.times {
            state.outstanding.push((*time, Arc::clone(&handler)));
        }
        state.requests.push(request);
    }

    fn cancel_all(&self) {
        let outstanding = {
            let mut state = self.state.lock().unwrap();
            state.cancel_calls += 1;
            std::mem::take(&mut state.outstanding)
        };
        for (time, handler) in outstanding {
            handler(GeneratedFrame::cancelled(time));
        }
    }
}

/// Hands out a new generator per call and remembers them in order.
#[derive(Default)]
pub struct FakeFactory {
    generators: Mutex<Vec<Arc<FakeGenerator>>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn generator(&self, index: usize) -> Arc<FakeGenerator> {
        Arc::clone(&self.generators.lock().unwrap()[index])
    }

    /// Generators created for the most recent session: thumbnails, then exports.
    pub fn session_generators(&self) -> (Arc<FakeGenerator>, Arc<FakeGenerator>) {
        let generators = self.generators.lock().unwrap();
        let len = generators.len();
        (
            Arc::clone(&generators[len - 2]),
            Arc::clone(&generators[len - 1]),
        )
    }
}

impl FrameGeneratorFactory for FakeFactory {
    fn make_generator(&self, media: &MediaHandle) -> Result<Arc<dyn FrameGenerator>> {
        if media.natural_size.is_none() {
            return Err(BridgeError::NotAvailable("no video track".to_string()));
        }
        let generator = Arc::new(FakeGenerator::default());
        self.generators.lock().unwrap().push(Arc::clone(&generator));
        Ok(generator)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Harness {
    pub core: CoreService,
    pub engine: Arc<FakeEngine>,
    pub factory: Arc<FakeFactory>,
}

pub fn harness() -> Harness {
    let engine = FakeEngine::new();
    let factory = FakeFactory::new();
    let config = CoreConfig::builder()
        .player_engine(engine.clone())
        .frame_generator_factory(factory.clone())
        .build()
        .expect("valid config");

    Harness {
        core: CoreService::new(config).expect("core starts"),
        engine,
        factory,
    }
}

pub fn solid_image(width: u32, height: u32) -> FrameImage {
    let rgba: Vec<u8> = [30u8, 120, 220, 255].repeat((width * height) as usize);
    FrameImage::new(width, height, rgba)
}

pub fn sample_asset() -> AssetDescriptor {
    AssetDescriptor::new("asset-1", 1920, 1080)
        .with_duration(MediaTime::from_seconds(10.0))
        .with_creation_date(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap())
        .with_location(GeoLocation::new(47.37, 8.54))
}

pub fn sample_media() -> MediaHandle {
    MediaHandle::new("file:///clip.mov")
        .with_video_track(Size::new(1920.0, 1080.0), 30.0)
        .with_duration(MediaTime::from_seconds(10.0))
}

pub fn sample_video() -> Arc<Video> {
    Arc::new(Video::new(sample_asset(), sample_media()))
}

pub fn seconds(value: f64) -> MediaTime {
    MediaTime::from_seconds(value)
}
