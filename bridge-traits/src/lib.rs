//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the frame grabber core and the
//! platform media stack. The core never decodes video itself: playback, frame
//! rendering, library access and image encoding are all provided by the host
//! through the traits below.
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlayerEngine`](playback::PlayerEngine) - Looping playback, seeking, property and time observation
//!
//! ### Media
//! - [`AssetProvider`](media::AssetProvider) - Poster images and decodable media for library assets
//! - [`FrameGenerator`](media::FrameGenerator) - Asynchronous, cancellable still-image generation
//! - [`FrameGeneratorFactory`](media::FrameGeneratorFactory) - Creates a generator bound to one media handle
//! - [`ImageEncoder`](media::ImageEncoder) - Encodes frames, optionally embedding metadata
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Callback Threading
//!
//! Engines and generators run on their own threads. Every callback they invoke
//! must be `Send`; the core funnels those callbacks onto its coordination thread
//! before touching any state, so implementations are free to call them from any
//! thread.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert native errors to `BridgeError` and report
//! user cancellation as [`BridgeError::Cancelled`] rather than as a failure.

pub mod error;
pub mod logging;
pub mod media;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    AssetDescriptor, AssetProvider, ContentMode, FrameGenerator, FrameGeneratorFactory,
    FrameHandler, FrameImage, GeneratedFrame, GenerationRequest, GenerationStatus, GeoLocation,
    ImageEncoder, ImageMetadata, ImageRequest, MediaHandle, ProgressCallback,
};
pub use playback::{
    EngineEvent, EngineEventSink, EngineStatus, ItemStatus, MediaTime, ObservationToken,
    PlayerEngine, SeekCompletion, SeekResult, Size, TimeControlStatus, TrackInfo, WaitingReason,
};
