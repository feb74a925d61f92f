//! Extracted frames and their export forms.

use bridge_traits::{FrameImage, ImageEncoder, ImageMetadata, MediaTime};
use bytes::Bytes;
use tracing::warn;

/// Rendered image plus the metadata it should carry when exported.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataImage {
    image: FrameImage,
    metadata: Option<ImageMetadata>,
}

impl MetadataImage {
    pub fn new(image: FrameImage, metadata: Option<ImageMetadata>) -> Self {
        Self { image, metadata }
    }

    /// The plain image, for display.
    pub fn image(&self) -> &FrameImage {
        &self.image
    }

    pub fn metadata(&self) -> Option<&ImageMetadata> {
        self.metadata.as_ref()
    }

    /// Encode as JPEG, embedding the metadata when asked to and when there is
    /// any to embed.
    pub fn jpeg_data(
        &self,
        encoder: &dyn ImageEncoder,
        including_metadata: bool,
        quality: f32,
    ) -> bridge_traits::error::Result<Bytes> {
        let metadata = if including_metadata {
            self.metadata.as_ref().filter(|metadata| !metadata.is_empty())
        } else {
            None
        };
        encoder.encode_jpeg(&self.image, metadata, quality)
    }
}

/// A still taken from a video.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Time the caller asked for.
    pub requested_time: MediaTime,
    /// Time of the produced image. May differ after keyframe snapping.
    pub actual_time: MediaTime,
    pub image: MetadataImage,
}

/// What gets handed to the host for sharing.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportItem {
    /// Encoded JPEG. `metadata_embedded` is `false` when embedding was not
    /// requested or could not be done.
    Jpeg {
        time: MediaTime,
        data: Bytes,
        metadata_embedded: bool,
    },
    /// The raw image, when encoding failed entirely.
    Image { time: MediaTime, image: FrameImage },
}

impl ExportItem {
    pub fn time(&self) -> MediaTime {
        match self {
            ExportItem::Jpeg { time, .. } | ExportItem::Image { time, .. } => *time,
        }
    }
}

impl Frame {
    pub fn new(requested_time: MediaTime, actual_time: MediaTime, image: MetadataImage) -> Self {
        Self {
            requested_time,
            actual_time,
            image,
        }
    }

    /// Plain image for display.
    pub fn display_image(&self) -> &FrameImage {
        self.image.image()
    }

    /// Produce the shareable form of this frame at its actual time.
    ///
    /// Falls back to a JPEG without metadata when embedding fails, and to the
    /// raw image when encoding fails altogether. Never returns nothing.
    pub fn export(
        &self,
        encoder: &dyn ImageEncoder,
        include_metadata: bool,
        quality: f32,
    ) -> ExportItem {
        let time = self.actual_time;
        let wants_metadata =
            include_metadata && self.image.metadata().is_some_and(|m| !m.is_empty());

        if wants_metadata {
            match self.image.jpeg_data(encoder, true, quality) {
                Ok(data) => {
                    return ExportItem::Jpeg {
                        time,
                        data,
                        metadata_embedded: true,
                    }
                }
                Err(e) => warn!(time = %time, error = %e, "Embedding metadata failed, exporting without it"),
            }
        }

        match self.image.jpeg_data(encoder, false, quality) {
            Ok(data) => ExportItem::Jpeg {
                time,
                data,
                metadata_embedded: false,
            },
            Err(e) => {
                warn!(time = %time, error = %e, "JPEG encoding failed, exporting raw image");
                ExportItem::Image {
                    time,
                    image: self.image.image().clone(),
                }
            }
        }
    }
}
