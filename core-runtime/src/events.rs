//! # Event Bus System
//!
//! Typed events broadcast over a `tokio` broadcast channel, so hosts can refresh
//! their UI when a merged sync finishes or a merge is edited without polling
//! the store.
//!
//! ## Overview
//!
//! - [`CoreEvent`] wraps one enum per domain: [`SyncEvent`] for merged syncs,
//!   [`LibraryEvent`] for edits to merge references
//! - [`EventBus`] is the sending side; clone it freely
//! - [`EventStream`] wraps a receiver and adds predicate filtering
//!
//! ```text
//! ┌─────────────────┐  emit  ┌──────────┐  subscribe  ┌────────────┐
//! │ MergeSyncEngine ├───────>│ EventBus ├────────────>│ Subscriber │
//! └─────────────────┘        └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, SyncEvent};
//!
//! # core_async::runtime::block_on(async {
//! let bus = EventBus::new(16);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Sync(_)));
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Cancelled {
//!     cycle_id: "c-1".to_string(),
//!     merged_entry_id: 3,
//! })).ok();
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Merged sync cancelled");
//! # });
//! ```
//!
//! ## Error Handling
//!
//! `RecvError::Lagged(n)` means a slow subscriber missed `n` events and can
//! keep reading. `RecvError::Closed` means every sender is gone. Emitting with
//! no subscribers returns `SendError`, which publishers ignore.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Sync(SyncEvent),
    Library(LibraryEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::ConstituentFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::ReferenceMerged { .. })
            | CoreEvent::Library(LibraryEvent::ReferenceUnmerged { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Merged entry the event concerns.
    pub fn merged_entry_id(&self) -> i64 {
        match self {
            CoreEvent::Sync(e) => e.merged_entry_id(),
            CoreEvent::Library(e) => e.merged_entry_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Lifecycle of one merged sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started {
        cycle_id: String,
        merged_entry_id: i64,
        /// Number of per-source groups fetched in parallel
        source_groups: u32,
    },
    /// One constituent failed; the rest of the run continues.
    ConstituentFailed {
        cycle_id: String,
        merged_entry_id: i64,
        constituent_entry_id: i64,
        source_id: i64,
        message: String,
    },
    Completed {
        cycle_id: String,
        merged_entry_id: i64,
        episodes_synced: u64,
        downloads_enqueued: u64,
        duration_ms: u64,
    },
    /// The run ended with an error; `episodes_synced` counts what was still
    /// persisted.
    Failed {
        cycle_id: String,
        merged_entry_id: i64,
        message: String,
        episodes_synced: u64,
    },
    Cancelled {
        cycle_id: String,
        merged_entry_id: i64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Merged sync started",
            SyncEvent::ConstituentFailed { .. } => "Constituent sync failed",
            SyncEvent::Completed { .. } => "Merged sync completed",
            SyncEvent::Failed { .. } => "Merged sync failed",
            SyncEvent::Cancelled { .. } => "Merged sync cancelled",
        }
    }

    /// Identifier shared by every event of one sync run.
    pub fn cycle_id(&self) -> &str {
        match self {
            SyncEvent::Started { cycle_id, .. }
            | SyncEvent::ConstituentFailed { cycle_id, .. }
            | SyncEvent::Completed { cycle_id, .. }
            | SyncEvent::Failed { cycle_id, .. }
            | SyncEvent::Cancelled { cycle_id, .. } => cycle_id,
        }
    }

    fn merged_entry_id(&self) -> i64 {
        match self {
            SyncEvent::Started { merged_entry_id, .. }
            | SyncEvent::ConstituentFailed { merged_entry_id, .. }
            | SyncEvent::Completed { merged_entry_id, .. }
            | SyncEvent::Failed { merged_entry_id, .. }
            | SyncEvent::Cancelled { merged_entry_id, .. } => *merged_entry_id,
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Edits to the set of references behind a merged entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    ReferenceMerged {
        merged_entry_id: i64,
        constituent_entry_id: i64,
    },
    ReferenceUnmerged {
        merged_entry_id: i64,
        constituent_entry_id: i64,
        remaining_references: u32,
    },
    SettingsUpdated {
        merged_entry_id: i64,
        references_updated: u32,
    },
    /// Metadata of the info constituent was refreshed from its source.
    InfoDetailsRefreshed {
        merged_entry_id: i64,
        constituent_entry_id: i64,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::ReferenceMerged { .. } => "Entry merged",
            LibraryEvent::ReferenceUnmerged { .. } => "Entry removed from merge",
            LibraryEvent::SettingsUpdated { .. } => "Merge settings updated",
            LibraryEvent::InfoDetailsRefreshed { .. } => "Merged entry details refreshed",
        }
    }

    fn merged_entry_id(&self) -> i64 {
        match self {
            LibraryEvent::ReferenceMerged { merged_entry_id, .. }
            | LibraryEvent::ReferenceUnmerged { merged_entry_id, .. }
            | LibraryEvent::SettingsUpdated { merged_entry_id, .. }
            | LibraryEvent::InfoDetailsRefreshed { merged_entry_id, .. } => *merged_entry_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast hub for [`CoreEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers may fall `capacity` events behind before
    /// lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Wait for the next accepted event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(merged_entry_id: i64) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Completed {
            cycle_id: "cycle-1".to_string(),
            merged_entry_id,
            episodes_synced: 12,
            downloads_enqueued: 2,
            duration_ms: 40,
        })
    }

    #[core_async::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(completed(1)).is_err());
    }

    #[core_async::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(completed(4)).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), completed(4));
        assert_eq!(second.recv().await.unwrap(), completed(4));
    }

    #[core_async::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(completed(1)).ok();
        let merged = CoreEvent::Library(LibraryEvent::ReferenceMerged {
            merged_entry_id: 1,
            constituent_entry_id: 8,
        });
        bus.emit(merged.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), merged);
        assert!(stream.try_recv().is_none());
    }

    #[core_async::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for id in 0..5 {
            bus.emit(CoreEvent::Sync(SyncEvent::Cancelled {
                cycle_id: format!("cycle-{}", id),
                merged_entry_id: id,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            cycle_id: "cycle-1".to_string(),
            merged_entry_id: 1,
            message: "source offline".to_string(),
            episodes_synced: 3,
        });
        let constituent = CoreEvent::Sync(SyncEvent::ConstituentFailed {
            cycle_id: "cycle-1".to_string(),
            merged_entry_id: 1,
            constituent_entry_id: 2,
            source_id: 10,
            message: "timeout".to_string(),
        });

        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(constituent.severity(), EventSeverity::Warning);
        assert_eq!(completed(1).severity(), EventSeverity::Info);
        assert!(EventSeverity::Error > EventSeverity::Warning);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Library(LibraryEvent::SettingsUpdated {
            merged_entry_id: 5,
            references_updated: 2,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Library");
        assert_eq!(json["payload"]["event"], "SettingsUpdated");
        assert_eq!(json["payload"]["references_updated"], 2);

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.merged_entry_id(), 5);
    }
}
