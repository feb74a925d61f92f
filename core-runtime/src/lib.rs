//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the frame grabber core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Coordination queue for funnelling backend callbacks
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on. It
//! establishes the single-coordination-thread discipline, logging conventions,
//! and event broadcasting mechanisms used throughout the system.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SessionSettings};
pub use dispatch::{CoordinationQueue, CoordinationSignal, QueueHandle};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
