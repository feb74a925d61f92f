//! # Playback Coordination Module
//!
//! Drives one looping playback session on a host playback engine.
//!
//! ## Overview
//!
//! This module handles:
//! - Coalescing bursts of seek requests into minimal engine seeks ([`TimeSeeker`])
//! - Fanning engine events out to weakly-held observers ([`ObservationHub`])
//! - Transport controls, readiness and failure tracking ([`PlaybackCoordinator`])
//!
//! Every type here lives on the coordination thread. Engine callbacks are
//! posted to coordination queues and applied by the `pump()` methods.

pub mod coordinator;
pub mod error;
pub mod observation;
pub mod seeker;

pub use coordinator::{PlaybackCoordinator, PlaybackNotice, PlaybackState, ReadinessLatch};
pub use error::{PlaybackError, Result};
pub use observation::{ObservationHub, ObserverId, PlayerObserver};
pub use seeker::{SeekReport, SeekToken, TimeSeeker};
