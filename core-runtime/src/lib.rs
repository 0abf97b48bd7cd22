//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the merged-entry engine crates:
//! - Logging and tracing setup
//! - Configuration with fail-fast validation
//! - The event bus
//!
//! ## Overview
//!
//! Hosts build a [`CoreConfig`](config::CoreConfig), call
//! [`init_logging`](logging::init_logging) once, and hand an
//! [`EventBus`](events::EventBus) to the sync engine to observe its progress.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, LibraryEvent, SyncEvent};
