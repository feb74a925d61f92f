//! Domain models for library videos
//!
//! A [`Video`] pairs the library's record of an asset with the decodable media
//! the host produced for it. It never changes after construction and is shared
//! read-only between playback and frame extraction.

use bridge_traits::{AssetDescriptor, ImageMetadata, MediaHandle, MediaTime, Size};
use serde::{Deserialize, Serialize};

/// Immutable handle combining a library asset and its decodable media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    asset: AssetDescriptor,
    media: MediaHandle,
}

impl Video {
    pub fn new(asset: AssetDescriptor, media: MediaHandle) -> Self {
        Self { asset, media }
    }

    pub fn asset(&self) -> &AssetDescriptor {
        &self.asset
    }

    pub fn media(&self) -> &MediaHandle {
        &self.media
    }

    /// Library identifier of the underlying asset.
    pub fn id(&self) -> &str {
        &self.asset.id
    }

    /// Decoder-reported size, falling back to the library's record when the
    /// decoder reports nothing or zero.
    pub fn pixel_size(&self) -> Size {
        match self.media.natural_size {
            Some(size) if !size.is_empty() => size,
            _ => self.asset.pixel_size(),
        }
    }

    /// Nominal frame rate; `None` without a video track.
    pub fn frame_rate(&self) -> Option<f32> {
        self.media.nominal_frame_rate
    }

    pub fn duration(&self) -> MediaTime {
        if self.media.duration > MediaTime::ZERO {
            self.media.duration
        } else {
            self.asset.duration
        }
    }

    /// Metadata embeddable into exported images, sourced from the library asset.
    pub fn metadata(&self) -> ImageMetadata {
        ImageMetadata::new(self.asset.creation_date, self.asset.location)
    }

    /// Summary for the presentation layer's details panel.
    pub fn details(&self) -> VideoDetails {
        let size = self.pixel_size();
        VideoDetails {
            width: size.width.round() as u32,
            height: size.height.round() as u32,
            frame_rate: self.frame_rate(),
            duration_ms: self.duration().as_millis(),
            metadata: self.metadata(),
        }
    }
}

/// Displayable video properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f32>,
    pub duration_ms: i64,
    pub metadata: ImageMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::GeoLocation;
    use chrono::{TimeZone, Utc};

    fn asset() -> AssetDescriptor {
        AssetDescriptor::new("asset-1", 1920, 1080)
            .with_duration(MediaTime::from_seconds(10.0))
            .with_creation_date(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap())
            .with_location(GeoLocation::new(47.37, 8.54))
    }

    #[test]
    fn test_pixel_size_prefers_decoder_size() {
        let media = MediaHandle::new("file:///a.mov").with_video_track(Size::new(1280.0, 720.0), 30.0);
        let video = Video::new(asset(), media);

        assert_eq!(video.pixel_size(), Size::new(1280.0, 720.0));
        assert_eq!(video.frame_rate(), Some(30.0));
    }

    #[test]
    fn test_pixel_size_falls_back_to_library_size() {
        let zero = MediaHandle::new("file:///a.mov").with_video_track(Size::ZERO, 24.0);
        assert_eq!(Video::new(asset(), zero).pixel_size(), Size::new(1920.0, 1080.0));

        let audio_only = MediaHandle::new("file:///a.m4a");
        let video = Video::new(asset(), audio_only);
        assert_eq!(video.pixel_size(), Size::new(1920.0, 1080.0));
        assert_eq!(video.frame_rate(), None);
    }

    #[test]
    fn test_metadata_comes_from_asset() {
        let video = Video::new(asset(), MediaHandle::new("file:///a.mov"));
        let metadata = video.metadata();

        assert_eq!(metadata.location, Some(GeoLocation::new(47.37, 8.54)));
        assert_eq!(
            metadata.creation_date,
            Some(Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_details() {
        let media = MediaHandle::new("file:///a.mov")
            .with_video_track(Size::new(3840.0, 2160.0), 60.0)
            .with_duration(MediaTime::from_seconds(4.5));
        let details = Video::new(asset(), media).details();

        assert_eq!((details.width, details.height), (3840, 2160));
        assert_eq!(details.frame_rate, Some(60.0));
        assert_eq!(details.duration_ms, 4500);
    }

    #[test]
    fn test_duration_falls_back_to_asset() {
        let video = Video::new(asset(), MediaHandle::new("file:///a.mov"));
        assert_eq!(video.duration(), MediaTime::from_seconds(10.0));
    }
}
