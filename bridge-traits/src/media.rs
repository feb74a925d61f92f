//! Media library and frame rendering bridges.
//!
//! - [`AssetProvider`] resolves library assets into poster images and decodable
//!   media handles (possibly downloading them from network-backed storage).
//! - [`FrameGenerator`] renders still images for requested times, one callback
//!   per time, from its own worker threads.
//! - [`ImageEncoder`] turns a rendered frame into an encoded image, embedding
//!   metadata when asked to.

use crate::error::Result;
use crate::playback::{MediaTime, Size};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Assets
// ============================================================================

/// Geographic location attached to a library asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

/// Metadata that can be embedded into exported images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub creation_date: Option<DateTime<Utc>>,
    pub location: Option<GeoLocation>,
}

impl ImageMetadata {
    pub fn new(creation_date: Option<DateTime<Utc>>, location: Option<GeoLocation>) -> Self {
        Self {
            creation_date,
            location,
        }
    }

    /// Returns `true` when there is nothing to embed.
    pub fn is_empty(&self) -> bool {
        self.creation_date.is_none() && self.location.is_none()
    }
}

/// Reference to a video in the host media library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Host-specific local identifier.
    pub id: String,
    /// Pixel dimensions recorded by the library.
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub duration: MediaTime,
    pub creation_date: Option<DateTime<Utc>>,
    pub location: Option<GeoLocation>,
}

impl AssetDescriptor {
    pub fn new(id: impl Into<String>, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            id: id.into(),
            pixel_width,
            pixel_height,
            duration: MediaTime::ZERO,
            creation_date: None,
            location: None,
        }
    }

    pub fn with_duration(mut self, duration: MediaTime) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn pixel_size(&self) -> Size {
        Size::new(self.pixel_width as f64, self.pixel_height as f64)
    }
}

/// Decodable media produced by the [`AssetProvider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaHandle {
    /// Host-specific handle identifier (e.g. a file URL or object id).
    pub id: String,
    /// Natural size of the first video track, as reported by the decoder.
    pub natural_size: Option<Size>,
    /// Nominal frame rate of the first video track. `None` without a video track.
    pub nominal_frame_rate: Option<f32>,
    pub duration: MediaTime,
}

impl MediaHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            natural_size: None,
            nominal_frame_rate: None,
            duration: MediaTime::ZERO,
        }
    }

    pub fn with_video_track(mut self, natural_size: Size, nominal_frame_rate: f32) -> Self {
        self.natural_size = Some(natural_size);
        self.nominal_frame_rate = Some(nominal_frame_rate);
        self
    }

    pub fn with_duration(mut self, duration: MediaTime) -> Self {
        self.duration = duration;
        self
    }
}

/// Decoded still image (tightly packed RGBA8).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Bytes,
}

impl FrameImage {
    pub fn new(width: u32, height: u32, rgba: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            rgba: rgba.into(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// How an image request fits the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentMode {
    AspectFit,
    AspectFill,
}

/// Request for a display-resolution still of an asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRequest {
    pub target_size: Size,
    pub content_mode: ContentMode,
    /// Allow fetching from network-backed storage.
    pub network_access_allowed: bool,
}

impl ImageRequest {
    pub fn new(target_size: Size, content_mode: ContentMode) -> Self {
        Self {
            target_size,
            content_mode,
            network_access_allowed: true,
        }
    }
}

/// Reports fractional download progress in `0.0..=1.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Host media library.
///
/// Dropping a returned future cancels the underlying request.
#[async_trait::async_trait]
pub trait AssetProvider: Send + Sync {
    /// Fetch a display-resolution still image. `Ok(None)` when the library has
    /// no image for the asset.
    async fn request_image(
        &self,
        asset: &AssetDescriptor,
        request: ImageRequest,
    ) -> Result<Option<FrameImage>>;

    /// Fetch (and if necessary download) decodable media for the asset.
    ///
    /// Returns [`BridgeError::Cancelled`](crate::BridgeError::Cancelled) when
    /// the host cancelled the request.
    async fn request_media(
        &self,
        asset: &AssetDescriptor,
        progress: ProgressCallback,
    ) -> Result<MediaHandle>;
}

// ============================================================================
// Frame Generation
// ============================================================================

/// Per-time status reported by a [`FrameGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Result for one requested time.
#[derive(Debug, Clone)]
pub struct GeneratedFrame {
    pub requested_time: MediaTime,
    /// Time of the image actually produced; may differ from the request.
    pub actual_time: MediaTime,
    pub status: GenerationStatus,
    pub image: Option<FrameImage>,
    pub error: Option<String>,
}

impl GeneratedFrame {
    pub fn succeeded(requested_time: MediaTime, actual_time: MediaTime, image: FrameImage) -> Self {
        Self {
            requested_time,
            actual_time,
            status: GenerationStatus::Succeeded,
            image: Some(image),
            error: None,
        }
    }

    pub fn failed(requested_time: MediaTime, error: impl Into<String>) -> Self {
        Self {
            requested_time,
            actual_time: MediaTime::ZERO,
            status: GenerationStatus::Failed,
            image: None,
            error: Some(error.into()),
        }
    }

    pub fn cancelled(requested_time: MediaTime) -> Self {
        Self {
            requested_time,
            actual_time: MediaTime::ZERO,
            status: GenerationStatus::Cancelled,
            image: None,
            error: None,
        }
    }
}

/// Parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub times: Vec<MediaTime>,
    /// Bounding size of produced images; `None` for full resolution.
    pub maximum_size: Option<Size>,
    pub tolerance_before: MediaTime,
    pub tolerance_after: MediaTime,
    pub applies_preferred_track_transform: bool,
}

impl GenerationRequest {
    /// Frame-exact request (zero tolerance) honouring the track transform.
    pub fn exact(times: Vec<MediaTime>, maximum_size: Option<Size>) -> Self {
        Self {
            times,
            maximum_size,
            tolerance_before: MediaTime::ZERO,
            tolerance_after: MediaTime::ZERO,
            applies_preferred_track_transform: true,
        }
    }
}

/// Receives one [`GeneratedFrame`] per requested time, from any thread.
pub type FrameHandler = Arc<dyn Fn(GeneratedFrame) + Send + Sync>;

/// Asynchronous still-image generator bound to one media handle.
pub trait FrameGenerator: Send + Sync {
    /// Start generating `request.times`. `handler` is called once per time.
    fn generate_frames(&self, request: GenerationRequest, handler: FrameHandler);

    /// Cancel all outstanding generation. Pending times report
    /// [`GenerationStatus::Cancelled`].
    fn cancel_all(&self);
}

/// Creates frame generators for a media handle.
pub trait FrameGeneratorFactory: Send + Sync {
    fn make_generator(&self, media: &MediaHandle) -> Result<Arc<dyn FrameGenerator>>;
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes frames for sharing.
pub trait ImageEncoder: Send + Sync {
    /// Encode `image` as JPEG at `quality` (`0.0..=1.0`), embedding `metadata`
    /// when provided.
    fn encode_jpeg(
        &self,
        image: &FrameImage,
        metadata: Option<&ImageMetadata>,
        quality: f32,
    ) -> Result<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_metadata_is_empty() {
        assert!(ImageMetadata::default().is_empty());
        let metadata = ImageMetadata::new(None, Some(GeoLocation::new(52.52, 13.40)));
        assert!(!metadata.is_empty());
    }

    #[test]
    fn asset_descriptor_builder() {
        let asset = AssetDescriptor::new("asset-1", 1920, 1080)
            .with_duration(MediaTime::from_seconds(12.0))
            .with_location(GeoLocation::new(1.0, 2.0).with_altitude(30.0));

        assert_eq!(asset.pixel_size(), Size::new(1920.0, 1080.0));
        assert_eq!(asset.location.and_then(|l| l.altitude), Some(30.0));
        assert!(asset.creation_date.is_none());
    }

    #[test]
    fn generated_frame_constructors() {
        let time = MediaTime::from_seconds(1.0);
        let frame = GeneratedFrame::failed(time, "decode error");
        assert_eq!(frame.status, GenerationStatus::Failed);
        assert!(frame.image.is_none());
        assert_eq!(frame.error.as_deref(), Some("decode error"));

        let cancelled = GeneratedFrame::cancelled(time);
        assert_eq!(cancelled.status, GenerationStatus::Cancelled);
    }

    #[test]
    fn exact_generation_request_has_zero_tolerance() {
        let request = GenerationRequest::exact(vec![MediaTime::ZERO], None);
        assert_eq!(request.tolerance_before, MediaTime::ZERO);
        assert_eq!(request.tolerance_after, MediaTime::ZERO);
        assert!(request.applies_preferred_track_transform);
        assert!(request.maximum_size.is_none());
    }
}
