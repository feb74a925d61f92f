//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (player engine, frame
//! generator factory, asset provider, image encoder) into the shared Rust core
//! and hands out one [`SessionOrchestrator`] per loaded video.
//!
//! ```no_run
//! # async fn example(config: core_runtime::CoreConfig, asset: bridge_traits::AssetDescriptor) -> core_service::Result<()> {
//! use core_service::{CoreService, ExportOptions};
//!
//! let core = CoreService::new(config)?;
//! let loader = core.video_loader(asset)?;
//! let video = core.load_video(&loader).await?;
//!
//! let mut session = core.open_session(video)?;
//! session.add_current_frame()?;
//! loop {
//!     session.next_activity().await;
//!     session.pump();
//! #   break;
//! }
//! session.export_selection(ExportOptions::default(), |outcome| println!("{:?}", outcome))?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod session;

pub use error::{CoreError, Result};
pub use session::{ExportOptions, ExportOutcome, ExportReply, SessionOrchestrator};

use std::sync::Arc;

use bridge_traits::{AssetDescriptor, ImageEncoder};
use core_frames::JpegXmpEncoder;
use core_library::{Video, VideoLoader};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
use core_runtime::logging::{init_logging, LoggingConfig};
use tracing::{debug, info};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    encoder: Arc<dyn ImageEncoder>,
    events: EventBus,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let encoder = config
            .image_encoder
            .clone()
            .unwrap_or_else(|| Arc::new(JpegXmpEncoder::new()));
        let events = EventBus::new(config.settings.event_buffer_size);

        Ok(Self {
            config: Arc::new(config),
            encoder,
            events,
        })
    }

    /// Install the global tracing subscriber. The configured logger sink is
    /// used unless `logging` already names one.
    pub fn init_logging(&self, mut logging: LoggingConfig) -> Result<()> {
        if logging.logger_sink.is_none() {
            logging.logger_sink = self.config.logger_sink.clone();
        }
        init_logging(logging)?;
        Ok(())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to everything the core publishes from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Loader for `asset`. Requires an asset provider.
    pub fn video_loader(&self, asset: AssetDescriptor) -> Result<VideoLoader> {
        let provider =
            self.config
                .asset_provider
                .clone()
                .ok_or_else(|| CoreError::CapabilityMissing {
                    capability: "AssetProvider".to_string(),
                    message: "Loading library videos requires an asset provider".to_string(),
                })?;
        Ok(VideoLoader::new(asset, provider))
    }

    /// Fetch the video behind `loader`, publishing download progress as
    /// [`SessionEvent::VideoLoadProgress`].
    pub async fn load_video(&self, loader: &VideoLoader) -> Result<Arc<Video>> {
        let mut progress = loader.progress();
        let load = loader.load_video();
        tokio::pin!(load);

        let mut last_percent = None;
        let result = loop {
            tokio::select! {
                result = &mut load => break result,
                changed = progress.changed() => {
                    if changed.is_err() {
                        break (&mut load).await;
                    }
                    let percent = (*progress.borrow_and_update() * 100.0).round().clamp(0.0, 100.0) as u8;
                    if last_percent != Some(percent) {
                        last_percent = Some(percent);
                        self.publish_progress(percent);
                    }
                }
            }
        };

        let video = result?;
        if last_percent != Some(100) {
            self.publish_progress(100);
        }
        info!(video = %video.id(), "Video loaded");
        Ok(Arc::new(video))
    }

    /// Open a session for `video`: playback starts loading immediately.
    pub fn open_session(&self, video: Arc<Video>) -> Result<SessionOrchestrator> {
        SessionOrchestrator::new(
            video,
            &self.config,
            Arc::clone(&self.encoder),
            self.events.clone(),
        )
    }

    fn publish_progress(&self, percent: u8) {
        debug!(percent, "Video load progress");
        let _ = self
            .events
            .emit(CoreEvent::Session(SessionEvent::VideoLoadProgress { percent }));
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("events", &self.events)
            .finish()
    }
}
