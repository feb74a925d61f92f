//! # Core Configuration Module
//!
//! Provides configuration management for the frame grabber core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the session settings. It enforces
//! fail-fast validation so a session is never started without the bridges it
//! cannot work without.
//!
//! ## Required Dependencies
//!
//! - `PlayerEngine` - Looping playback, seeking and observation
//! - `FrameGeneratorFactory` - Still-image generation for thumbnails and exports
//!
//! ## Optional Dependencies
//!
//! - `AssetProvider` - Poster images and media downloads (only needed by `VideoLoader`)
//! - `ImageEncoder` - JPEG encoding with metadata (the service falls back to its built-in encoder)
//! - `LoggerSink` - Host log forwarding
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SessionSettings};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .player_engine(Arc::new(MyEngine::new()))
//!     .frame_generator_factory(Arc::new(MyGeneratorFactory))
//!     .settings(SessionSettings::default().with_screen_scale(3.0))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics with an actionable message: no PlayerEngine was provided
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AssetProvider, FrameGeneratorFactory, ImageEncoder, LoggerSink, PlayerEngine, Size,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Core configuration for the frame grabber.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Playback engine (required)
    pub player_engine: Arc<dyn PlayerEngine>,

    /// Frame generation backend (required)
    pub frame_generator_factory: Arc<dyn FrameGeneratorFactory>,

    /// Media library access (optional)
    pub asset_provider: Option<Arc<dyn AssetProvider>>,

    /// Image encoder used for exports (optional)
    pub image_encoder: Option<Arc<dyn ImageEncoder>>,

    /// Host log forwarding (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Session tuning
    pub settings: SessionSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("player_engine", &"PlayerEngine { ... }")
            .field("frame_generator_factory", &"FrameGeneratorFactory { ... }")
            .field(
                "asset_provider",
                &self.asset_provider.as_ref().map(|_| "AssetProvider { ... }"),
            )
            .field(
                "image_encoder",
                &self.image_encoder.as_ref().map(|_| "ImageEncoder { ... }"),
            )
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

// ============================================================================
// Session Settings
// ============================================================================

/// Tunables for one editing session.
///
/// Deserializable so hosts can ship them as JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Periodic time observation rate in ticks per second
    #[serde(default = "default_periodic_rate_hz")]
    pub periodic_rate_hz: u32,

    /// Size of a thumbnail cell in display points
    #[serde(default = "default_thumbnail_display_size")]
    pub thumbnail_display_size: Size,

    /// Pixels per display point on the output device
    #[serde(default = "default_screen_scale")]
    pub screen_scale: f64,

    /// JPEG compression quality for exports (0.0 - 1.0)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: f32,

    /// Whether exports embed asset metadata unless the caller says otherwise
    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,

    /// Event bus buffer size
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

fn default_periodic_rate_hz() -> u32 {
    30
}

fn default_thumbnail_display_size() -> Size {
    Size::new(80.0, 80.0)
}

fn default_screen_scale() -> f64 {
    2.0
}

fn default_jpeg_quality() -> f32 {
    1.0
}

fn default_include_metadata() -> bool {
    true
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            periodic_rate_hz: default_periodic_rate_hz(),
            thumbnail_display_size: default_thumbnail_display_size(),
            screen_scale: default_screen_scale(),
            jpeg_quality: default_jpeg_quality(),
            include_metadata: default_include_metadata(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl SessionSettings {
    /// Interval between periodic time ticks.
    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.periodic_rate_hz.max(1) as f64)
    }

    pub fn with_periodic_rate_hz(mut self, rate: u32) -> Self {
        self.periodic_rate_hz = rate;
        self
    }

    pub fn with_thumbnail_display_size(mut self, size: Size) -> Self {
        self.thumbnail_display_size = size;
        self
    }

    pub fn with_screen_scale(mut self, scale: f64) -> Self {
        self.screen_scale = scale;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: f32) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validates ranges.
    pub fn validate(&self) -> Result<()> {
        if self.periodic_rate_hz == 0 {
            return Err(Error::Config(
                "Periodic rate must be greater than 0 Hz".to_string(),
            ));
        }

        if self.thumbnail_display_size.is_empty() {
            return Err(Error::Config(
                "Thumbnail display size must have a positive width and height".to_string(),
            ));
        }

        if !(self.screen_scale > 0.0) {
            return Err(Error::Config(
                "Screen scale must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(Error::Config(
                "JPEG quality must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    player_engine: Option<Arc<dyn PlayerEngine>>,
    frame_generator_factory: Option<Arc<dyn FrameGeneratorFactory>>,
    asset_provider: Option<Arc<dyn AssetProvider>>,
    image_encoder: Option<Arc<dyn ImageEncoder>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    settings: Option<SessionSettings>,
}

impl CoreConfigBuilder {
    /// Sets the playback engine (required).
    pub fn player_engine(mut self, engine: Arc<dyn PlayerEngine>) -> Self {
        self.player_engine = Some(engine);
        self
    }

    /// Sets the frame generation backend (required).
    pub fn frame_generator_factory(mut self, factory: Arc<dyn FrameGeneratorFactory>) -> Self {
        self.frame_generator_factory = Some(factory);
        self
    }

    /// Sets the media library provider (optional).
    pub fn asset_provider(mut self, provider: Arc<dyn AssetProvider>) -> Self {
        self.asset_provider = Some(provider);
        self
    }

    /// Sets the export encoder (optional).
    pub fn image_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.image_encoder = Some(encoder);
        self
    }

    /// Sets the host logger sink (optional).
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Overrides the default session settings.
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge was not provided
    /// - [`Error::Config`] when the settings are out of range
    pub fn build(self) -> Result<CoreConfig> {
        let player_engine = self.player_engine.ok_or_else(|| Error::CapabilityMissing {
            capability: "PlayerEngine".to_string(),
            message: "A PlayerEngine implementation is required for playback and seeking. \
                      Inject the platform player (AVPlayer, ExoPlayer, GStreamer) with .player_engine()."
                .to_string(),
        })?;

        let frame_generator_factory =
            self.frame_generator_factory
                .ok_or_else(|| Error::CapabilityMissing {
                    capability: "FrameGeneratorFactory".to_string(),
                    message: "A FrameGeneratorFactory implementation is required for thumbnails and exports. \
                              Inject the platform image generator with .frame_generator_factory()."
                        .to_string(),
                })?;

        let config = CoreConfig {
            player_engine,
            frame_generator_factory,
            asset_provider: self.asset_provider,
            image_encoder: self.image_encoder,
            logger_sink: self.logger_sink,
            settings: self.settings.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
