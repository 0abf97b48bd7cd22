//! # Host Bridge Traits
//!
//! Capability traits the host application implements for the merged-entry
//! engine.
//!
//! ## Overview
//!
//! The engine never talks to a website, a file system, or a logging backend
//! directly. Each of those concerns is a trait defined here and injected by the
//! host at construction time:
//!
//! ### Content sources
//! - [`Source`](source::Source) - One remote (or local) content source: episode
//!   listing, entry details, page listing
//! - [`SourceResolver`](source::SourceResolver) - Runtime lookup of sources by id;
//!   [`SourceRegistry`](source::SourceRegistry) is the map-backed implementation
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert site-specific failures (HTTP status, markup changes) into
//! `Network` or `Parse` with enough context to identify the entry involved.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: the sync engine calls sources from
//! several tasks at once.

pub mod error;
pub mod source;
pub mod time;

pub use error::BridgeError;

pub use source::{
    EntryDetails, EntryStatus, RemoteEpisode, RemotePage, Source, SourceEntry, SourceId,
    SourceRegistry, SourceResolver,
};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
