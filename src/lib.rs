//! Workspace façade crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-service`, `core-frames`, `core-playback`). Host applications
//! can depend on `frame-grabber-workspace` and enable the documented features
//! without wiring each crate individually.

#[cfg(feature = "service")]
pub use core_service as service;

#[cfg(feature = "frames")]
pub use core_frames as frames;

#[cfg(feature = "playback")]
pub use core_playback as playback;
