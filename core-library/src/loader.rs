//! Loads poster images and decodable media for one library asset.
//!
//! Each kind of request is exclusive: starting a new poster or video request
//! cancels the pending one of the same kind. Dropping the returned future
//! cancels the request as well, and [`VideoLoader::cancel_all_requests`]
//! cancels both kinds at once (also done on drop).

use crate::error::{LibraryError, Result};
use crate::models::Video;
use bridge_traits::{AssetDescriptor, AssetProvider, FrameImage, ImageRequest, ProgressCallback};
use futures::future::{AbortHandle, Abortable};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

pub struct VideoLoader {
    asset: AssetDescriptor,
    provider: Arc<dyn AssetProvider>,
    progress: Arc<watch::Sender<f64>>,
    image_request: Mutex<Option<AbortHandle>>,
    video_request: Mutex<Option<AbortHandle>>,
}

impl VideoLoader {
    pub fn new(asset: AssetDescriptor, provider: Arc<dyn AssetProvider>) -> Self {
        let (progress, _) = watch::channel(0.0);
        Self {
            asset,
            provider,
            progress: Arc::new(progress),
            image_request: Mutex::new(None),
            video_request: Mutex::new(None),
        }
    }

    pub fn asset(&self) -> &AssetDescriptor {
        &self.asset
    }

    /// Download progress of the current video request, `0.0..=1.0`.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    /// Fetch a display-resolution still for the asset.
    ///
    /// `Ok(None)` when the library has no image for it.
    #[instrument(skip(self), fields(asset_id = %self.asset.id))]
    pub async fn load_poster_image(&self, request: ImageRequest) -> Result<Option<FrameImage>> {
        let registration = replace_request(&self.image_request);
        let fetch = self.provider.request_image(&self.asset, request);

        match Abortable::new(fetch, registration).await {
            Ok(result) => result.map_err(LibraryError::from),
            Err(_) => {
                debug!("Poster image request cancelled");
                Err(LibraryError::Cancelled)
            }
        }
    }

    /// Fetch (downloading if necessary) decodable media and build the [`Video`].
    ///
    /// # Errors
    ///
    /// - [`LibraryError::Cancelled`] when superseded, cancelled or cancelled by the host
    /// - [`LibraryError::FetchFailed`] otherwise; the caller may retry
    #[instrument(skip(self), fields(asset_id = %self.asset.id))]
    pub async fn load_video(&self) -> Result<Video> {
        let registration = replace_request(&self.video_request);
        self.progress.send_replace(0.0);

        let sender = Arc::clone(&self.progress);
        let on_progress: ProgressCallback = Arc::new(move |fraction: f64| {
            sender.send_replace(fraction.clamp(0.0, 1.0));
        });

        let fetch = self.provider.request_media(&self.asset, on_progress);

        let media = match Abortable::new(fetch, registration).await {
            Ok(Ok(media)) => media,
            Ok(Err(err)) if err.is_cancelled() => {
                debug!("Video request cancelled by host");
                return Err(LibraryError::Cancelled);
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Video request failed");
                return Err(LibraryError::FetchFailed {
                    asset_id: self.asset.id.clone(),
                    message: err.to_string(),
                });
            }
            Err(_) => {
                debug!("Video request cancelled");
                return Err(LibraryError::Cancelled);
            }
        };

        self.progress.send_replace(1.0);
        debug!(media_id = %media.id, "Video loaded");

        Ok(Video::new(self.asset.clone(), media))
    }

    pub fn cancel_all_requests(&self) {
        cancel_request(&self.image_request);
        cancel_request(&self.video_request);
    }
}

impl Drop for VideoLoader {
    fn drop(&mut self) {
        self.cancel_all_requests();
    }
}

impl std::fmt::Debug for VideoLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoLoader")
            .field("asset", &self.asset.id)
            .field("provider", &"AssetProvider { ... }")
            .finish()
    }
}

/// Cancel the pending request in `slot` and register a new one.
fn replace_request(slot: &Mutex<Option<AbortHandle>>) -> futures::future::AbortRegistration {
    let (handle, registration) = AbortHandle::new_pair();
    let previous = match slot.lock() {
        Ok(mut guard) => guard.replace(handle),
        Err(poisoned) => poisoned.into_inner().replace(handle),
    };
    if let Some(previous) = previous {
        previous.abort();
    }
    registration
}

fn cancel_request(slot: &Mutex<Option<AbortHandle>>) {
    let pending = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(pending) = pending {
        pending.abort();
    }
}
