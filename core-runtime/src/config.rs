//! # Core Configuration Module
//!
//! Builder-based configuration for the merged-entry engine.
//!
//! ## Overview
//!
//! [`CoreConfig`] gathers the host capabilities and tuning knobs the engine
//! needs. [`CoreConfigBuilder::build`] validates everything up front so a
//! misconfigured host fails at startup rather than halfway through a sync.
//!
//! ## Required Dependencies
//!
//! - `SourceResolver` - Looks up content sources by id
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source for episode fetch timestamps (default: `SystemClock`)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::SourceRegistry;
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .source_resolver(Arc::new(SourceRegistry::new().with_source(my_source)))
//!     .max_concurrent_sources(3)
//!     .fetch_timeout_secs(30)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! A missing resolver yields [`Error::CapabilityMissing`]; out-of-range values
//! yield [`Error::Config`] naming the offending setting.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{Clock, SourceResolver, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of source groups fetched at the same time.
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 5;

/// Upper bound on parallel source groups.
pub const MAX_CONCURRENT_SOURCES_LIMIT: usize = 32;

/// Upper bound on a per-constituent fetch timeout.
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

/// Core configuration for the merged-entry engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Content source lookup (required)
    pub source_resolver: Arc<dyn SourceResolver>,

    /// Time source for fetch timestamps
    pub clock: Arc<dyn Clock>,

    /// Source groups fetched concurrently during a merged sync
    pub max_concurrent_sources: usize,

    /// Per-constituent fetch timeout; `None` waits indefinitely
    pub fetch_timeout: Option<Duration>,

    /// Whether newly synced episodes are enqueued for download
    pub download_new_episodes: bool,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    pub logging: LoggingConfig,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("source_resolver", &"SourceResolver { ... }")
            .field("clock", &"Clock { ... }")
            .field("max_concurrent_sources", &self.max_concurrent_sources)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("download_new_episodes", &self.download_new_episodes)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - At least one and at most [`MAX_CONCURRENT_SOURCES_LIMIT`] source groups run at once
    /// - The fetch timeout, when set, is non-zero and within [`MAX_FETCH_TIMEOUT_SECS`]
    /// - The event buffer holds at least one event
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_sources == 0 {
            return Err(Error::Config(
                "max_concurrent_sources must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_sources > MAX_CONCURRENT_SOURCES_LIMIT {
            return Err(Error::Config(format!(
                "max_concurrent_sources exceeds maximum of {}",
                MAX_CONCURRENT_SOURCES_LIMIT
            )));
        }

        if let Some(timeout) = self.fetch_timeout {
            if timeout.is_zero() {
                return Err(Error::Config(
                    "fetch timeout must be greater than 0 seconds".to_string(),
                ));
            }
            if timeout > Duration::from_secs(MAX_FETCH_TIMEOUT_SECS) {
                return Err(Error::Config(format!(
                    "fetch timeout exceeds maximum of {} seconds",
                    MAX_FETCH_TIMEOUT_SECS
                )));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn source_resolver_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SourceResolver".to_string(),
        message: "A SourceResolver is required to look up constituent sources. \
                  Register the host's installed sources in a SourceRegistry or \
                  inject a resolver backed by the extension manager."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    source_resolver: Option<Arc<dyn SourceResolver>>,
    clock: Option<Arc<dyn Clock>>,
    max_concurrent_sources: Option<usize>,
    fetch_timeout_secs: Option<u64>,
    download_new_episodes: Option<bool>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the source resolver (required).
    pub fn source_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.source_resolver = Some(resolver);
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets how many source groups a merged sync fetches at once.
    ///
    /// Default: 5
    pub fn max_concurrent_sources(mut self, limit: usize) -> Self {
        self.max_concurrent_sources = Some(limit);
        self
    }

    /// Sets a timeout applied to each constituent fetch.
    ///
    /// Default: no timeout
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = Some(secs);
        self
    }

    /// Enables or disables download enqueueing after a sync.
    ///
    /// Default: true
    pub fn download_new_episodes(mut self, enabled: bool) -> Self {
        self.download_new_episodes = Some(enabled);
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the final [`CoreConfig`].
    ///
    /// # Returns
    ///
    /// Returns an error if:
    /// - No `SourceResolver` was provided
    /// - A numeric setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let source_resolver = self
            .source_resolver
            .ok_or_else(source_resolver_missing_error)?;

        let config = CoreConfig {
            source_resolver,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            max_concurrent_sources: self
                .max_concurrent_sources
                .unwrap_or(DEFAULT_MAX_CONCURRENT_SOURCES),
            fetch_timeout: self.fetch_timeout_secs.map(Duration::from_secs),
            download_new_episodes: self.download_new_episodes.unwrap_or(true),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
