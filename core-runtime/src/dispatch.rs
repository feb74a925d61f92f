//! # Coordination Queue
//!
//! All core state lives on one coordination thread and is never locked.
//! Playback engines and frame generators call back from their own threads, so
//! every callback is funnelled through a [`CoordinationQueue`]: the callback
//! holds a cloneable, `Send` [`QueueHandle`] and only posts a message; the
//! owning component drains the queue on the coordination thread and applies
//! the messages in posting order.
//!
//! ```text
//!  engine thread ──post──┐
//!                        ├──> CoordinationQueue ──drain()──> component state
//!  generator thread ─post┘          │
//!                                   └── CoordinationSignal (wakes the host loop)
//! ```
//!
//! Several queues may share one [`CoordinationSignal`], so an async host loop
//! can wait for activity on any of them and then pump every component.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Wakes the coordination loop when a message was posted.
#[derive(Clone, Default)]
pub struct CoordinationSignal {
    notify: Arc<Notify>,
}

impl CoordinationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record activity. Stores a permit if nobody is waiting yet.
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Wait until a message has been posted since the last wake-up.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

impl fmt::Debug for CoordinationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationSignal").finish_non_exhaustive()
    }
}

/// Sending half given to backend callbacks.
pub struct QueueHandle<M> {
    sender: mpsc::UnboundedSender<M>,
    signal: CoordinationSignal,
}

impl<M> Clone for QueueHandle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<M: Send> QueueHandle<M> {
    /// Post a message for the coordination thread.
    ///
    /// # Errors
    ///
    /// [`Error::QueueClosed`] once the owning queue has been dropped; the
    /// message is discarded.
    pub fn post(&self, message: M) -> Result<()> {
        self.sender.send(message).map_err(|_| Error::QueueClosed)?;
        self.signal.notify();
        Ok(())
    }

    /// Returns `true` once the owning queue has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<M> fmt::Debug for QueueHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueHandle")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Receiving half, owned by a component on the coordination thread.
pub struct CoordinationQueue<M> {
    receiver: mpsc::UnboundedReceiver<M>,
    handle: QueueHandle<M>,
}

impl<M: Send> CoordinationQueue<M> {
    /// Create a queue with its own signal.
    pub fn new() -> Self {
        Self::with_signal(CoordinationSignal::new())
    }

    /// Create a queue that wakes `signal` on every post.
    pub fn with_signal(signal: CoordinationSignal) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            receiver,
            handle: QueueHandle { sender, signal },
        }
    }

    /// A new sending handle for a backend callback.
    pub fn handle(&self) -> QueueHandle<M> {
        self.handle.clone()
    }

    pub fn signal(&self) -> &CoordinationSignal {
        &self.handle.signal
    }

    /// Next pending message, if any. Never waits.
    pub fn try_next(&mut self) -> Option<M> {
        self.receiver.try_recv().ok()
    }

    /// All pending messages in posting order.
    pub fn drain(&mut self) -> Vec<M> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl<M: Send> Default for CoordinationQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for CoordinationQueue<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinationQueue").finish_non_exhaustive()
    }
}
