//! # Observation Hub
//!
//! Fans out the engine's single stream of player and item events to any number
//! of observers, without owning them.
//!
//! ## Lifetime
//!
//! The hub stores a weak reference per observer, keyed by the observer's
//! address. Letting the last `Rc` go is enough to stop deliveries: dead
//! registrations are pruned after every delivery pass. [`ObservationHub::unregister`]
//! exists for observers that want to stop listening before they are dropped.
//!
//! ## Delivery
//!
//! Events are delivered on the coordination thread, in the order the engine
//! posted them, to observers in registration order. A panicking observer is
//! logged and skipped; the remaining observers still receive the event.
//!
//! ```ignore
//! struct Scrubber;
//!
//! impl PlayerObserver for Scrubber {
//!     fn player_time_ticked(&self, time: MediaTime) {
//!         println!("now at {}", time);
//!     }
//! }
//!
//! let scrubber = Rc::new(Scrubber);
//! hub.register(&scrubber);
//! hub.pump();
//! drop(scrubber); // pruned on the next pump
//! ```

use bridge_traits::{
    EngineEvent, EngineStatus, ItemStatus, MediaTime, ObservationToken, PlayerEngine, Size,
    TimeControlStatus, TrackInfo, WaitingReason,
};
use core_runtime::dispatch::{CoordinationQueue, CoordinationSignal};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Receives player and item events. Every method defaults to doing nothing.
pub trait PlayerObserver {
    fn player_status_changed(&self, _status: EngineStatus) {}

    fn player_rate_changed(&self, _rate: f32) {}

    fn player_time_control_status_changed(&self, _status: TimeControlStatus) {}

    fn player_waiting_reason_changed(&self, _reason: Option<&WaitingReason>) {}

    /// The looping engine moved to a new item (a loop boundary).
    fn player_current_item_changed(&self, _item_id: Option<&str>) {}

    /// Periodic play head update, at the hub's tick interval.
    fn player_time_ticked(&self, _time: MediaTime) {}

    fn item_status_changed(&self, _status: ItemStatus) {}

    fn item_duration_changed(&self, _duration: MediaTime) {}

    fn item_presentation_size_changed(&self, _size: Size) {}

    fn item_tracks_changed(&self, _tracks: &[TrackInfo]) {}
}

fn dispatch(observer: &dyn PlayerObserver, event: &EngineEvent) {
    match event {
        EngineEvent::Status { status } => observer.player_status_changed(*status),
        EngineEvent::Rate { rate } => observer.player_rate_changed(*rate),
        EngineEvent::TimeControlStatus { status } => {
            observer.player_time_control_status_changed(*status)
        }
        EngineEvent::WaitingReason { reason } => {
            observer.player_waiting_reason_changed(reason.as_ref())
        }
        EngineEvent::CurrentItemChanged { item_id } => {
            observer.player_current_item_changed(item_id.as_deref())
        }
        EngineEvent::PeriodicTime { time } => observer.player_time_ticked(*time),
        EngineEvent::ItemStatus { status } => observer.item_status_changed(*status),
        EngineEvent::ItemDuration { duration } => observer.item_duration_changed(*duration),
        EngineEvent::ItemPresentationSize { size } => {
            observer.item_presentation_size_changed(*size)
        }
        EngineEvent::ItemTracks { tracks } => observer.item_tracks_changed(tracks),
    }
}

/// Stable identity of a registered observer (its allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

impl ObserverId {
    fn of<O: ?Sized>(observer: &Rc<O>) -> Self {
        Self(Rc::as_ptr(observer) as *const () as usize)
    }
}

struct Registration {
    id: ObserverId,
    observer: Weak<dyn PlayerObserver>,
}

impl Registration {
    fn is_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }
}

struct EngineSubscriptions {
    periodic: ObservationToken,
    properties: ObservationToken,
}

pub struct ObservationHub {
    engine: Arc<dyn PlayerEngine>,
    queue: CoordinationQueue<EngineEvent>,
    registrations: Vec<Registration>,
    subscriptions: Option<EngineSubscriptions>,
}

impl ObservationHub {
    /// Subscribe to `engine`'s periodic ticks (every `interval`) and property
    /// changes. Both stay attached until [`detach`](Self::detach).
    pub fn attach(
        engine: Arc<dyn PlayerEngine>,
        interval: Duration,
        signal: CoordinationSignal,
    ) -> Self {
        let queue = CoordinationQueue::with_signal(signal);

        let periodic_handle = queue.handle();
        let periodic = engine.add_periodic_time_observer(
            interval,
            Arc::new(move |event| {
                if periodic_handle.post(event).is_err() {
                    trace!("Time tick after hub was dropped");
                }
            }),
        );

        let property_handle = queue.handle();
        let properties = engine.add_property_observer(Arc::new(move |event| {
            if property_handle.post(event).is_err() {
                trace!("Property change after hub was dropped");
            }
        }));

        debug!(interval_ms = interval.as_millis() as u64, "Observation hub attached");

        Self {
            engine,
            queue,
            registrations: Vec::new(),
            subscriptions: Some(EngineSubscriptions {
                periodic,
                properties,
            }),
        }
    }

    /// Register `observer` unless it is already registered.
    pub fn register<O>(&mut self, observer: &Rc<O>) -> ObserverId
    where
        O: PlayerObserver + 'static,
    {
        let id = ObserverId::of(observer);
        let weak: Weak<O> = Rc::downgrade(observer);
        let weak: Weak<dyn PlayerObserver> = weak;

        if let Some(position) = self.registrations.iter().position(|r| r.id == id) {
            if self.registrations[position].is_alive() {
                return id;
            }
            // A dead observer's address was reused by a new one
            self.registrations.remove(position);
        }

        self.registrations.push(Registration { id, observer: weak });
        id
    }

    /// Remove `observer`. Returns `false` if it was not registered.
    pub fn unregister<O>(&mut self, observer: &Rc<O>) -> bool
    where
        O: PlayerObserver + 'static,
    {
        let id = ObserverId::of(observer);
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Registrations currently held, including dead ones not yet pruned.
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_attached(&self) -> bool {
        self.subscriptions.is_some()
    }

    /// Take the events posted by the engine. Empty once detached.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        let events = self.queue.drain();
        if self.is_attached() {
            events
        } else {
            Vec::new()
        }
    }

    /// Deliver one event to every live observer, then prune dead ones.
    pub fn deliver(&mut self, event: &EngineEvent) {
        for registration in &self.registrations {
            let Some(observer) = registration.observer.upgrade() else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&*observer, event)));
            if outcome.is_err() {
                error!(observer = registration.id.0, ?event, "Observer panicked during delivery");
            }
        }

        self.registrations.retain(Registration::is_alive);
    }

    /// Drain and deliver everything pending. Returns the number of events.
    pub fn pump(&mut self) -> usize {
        let events = self.drain();
        for event in &events {
            self.deliver(event);
        }
        events.len()
    }

    /// Remove the engine subscriptions. Safe to call more than once.
    pub fn detach(&mut self) {
        if let Some(subscriptions) = self.subscriptions.take() {
            self.engine.remove_observer(subscriptions.periodic);
            self.engine.remove_observer(subscriptions.properties);
            let discarded = self.queue.drain().len();
            debug!(discarded, "Observation hub detached");
        }
    }
}

impl Drop for ObservationHub {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ObservationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationHub")
            .field("registrations", &self.registrations.len())
            .field("attached", &self.is_attached())
            .finish()
    }
}
