//! # Frame Extraction Module
//!
//! Still frames for a loaded video: low-resolution thumbnails the user adds to
//! the session and full-resolution exports carrying embedded metadata.
//!
//! ## Overview
//!
//! This module handles:
//! - Batched, cancellable generation through a host [`FrameGenerator`](bridge_traits::FrameGenerator)
//!   with one outcome per batch ([`FrameExtractor`])
//! - The sorted collection of frames the user picked ([`ThumbnailCollection`])
//! - Thumbnail sizing for the output display ([`geometry`])
//! - JPEG encoding with an XMP metadata packet ([`JpegXmpEncoder`])
//!
//! Like playback, extraction state lives on the coordination thread. Generator
//! callbacks are posted to a coordination queue and aggregated in
//! [`FrameExtractor::pump`].

pub mod collection;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod frame;
pub mod geometry;

pub use collection::ThumbnailCollection;
pub use encoder::JpegXmpEncoder;
pub use error::{FrameError, Result};
pub use extractor::{BatchId, BatchKind, BatchOutcome, FrameExtractor, FramesOutcome};
pub use frame::{ExportItem, Frame, MetadataImage};
