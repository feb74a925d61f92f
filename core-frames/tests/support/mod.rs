//! Scriptable frame generator for extraction tests.
//!
//! Requests are held until the test answers them. `cancel_all` answers every
//! outstanding time with a cancelled result, like a real generator does.

#![allow(dead_code)]

use bridge_traits::{
    AssetDescriptor, FrameGenerator, FrameHandler, FrameImage, GeneratedFrame, GenerationRequest,
    GeoLocation, MediaHandle, MediaTime, Size,
};
use chrono::{TimeZone, Utc};
use core_library::Video;
use std::sync::{Arc, Mutex};

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
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().unwrap().outstanding.len()
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().unwrap().cancel_calls
    }

    /// Answer `time` with an image taken exactly at `time`.
    pub fn succeed(&self, time: MediaTime) -> bool {
        self.succeed_at(time, time)
    }

    /// Answer `requested` with an image snapped to `actual`.
    pub fn succeed_at(&self, requested: MediaTime, actual: MediaTime) -> bool {
        self.answer(
            requested,
            GeneratedFrame::succeeded(requested, actual, solid_image(4, 4)),
        )
    }

    pub fn fail(&self, time: MediaTime, message: &str) -> bool {
        self.answer(time, GeneratedFrame::failed(time, message))
    }

    pub fn cancel(&self, time: MediaTime) -> bool {
        self.answer(time, GeneratedFrame::cancelled(time))
    }

    fn answer(&self, time: MediaTime, frame: GeneratedFrame) -> bool {
        let handler = {
            let mut state = self.state.lock().unwrap();
            let Some(position) = state.outstanding.iter().position(|(t, _)| *t == time) else {
                return false;
            };
            state.outstanding.remove(position).1
        };
        handler(frame);
        true
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

pub fn solid_image(width: u32, height: u32) -> FrameImage {
    let pixels = (width * height) as usize;
    let rgba: Vec<u8> = [200u8, 40, 90, 255].repeat(pixels);
    FrameImage::new(width, height, rgba)
}

/// 1080p clip with a creation date and location.
pub fn sample_video() -> Arc<Video> {
    let asset = AssetDescriptor::new("asset-1", 1920, 1080)
        .with_creation_date(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap())
        .with_location(GeoLocation::new(47.37, 8.54));
    let media = MediaHandle::new("file:///clip.mov")
        .with_video_track(Size::new(1920.0, 1080.0), 30.0)
        .with_duration(MediaTime::from_seconds(10.0));
    Arc::new(Video::new(asset, media))
}

pub fn seconds(value: f64) -> MediaTime {
    MediaTime::from_seconds(value)
}
