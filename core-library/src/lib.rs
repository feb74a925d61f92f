//! # Video Library Module
//!
//! Turns a library asset into a playable [`Video`].
//!
//! ## Overview
//!
//! This module manages:
//! - The immutable `Video` model shared by playback and frame extraction
//! - Poster image and video data requests through the host `AssetProvider`
//! - Download progress and cancellation of those requests

pub mod error;
pub mod loader;
pub mod models;

pub use error::{LibraryError, Result};
pub use loader::VideoLoader;
pub use models::{Video, VideoDetails};
