//! Integration tests for the global logging setup

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

// Only one test in this binary may install the global subscriber.
#[test]
fn test_init_logging_mirrors_events_to_sink_once() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(
        target: "core_sync",
        merged_entry_id = 3,
        constituent_url = "/title/99?session=abc",
        "Merged sync completed"
    );
    tracing::debug!(target: "core_sync", "below sink level");
    tracing::info!(target: "hyper", "filtered out by default directive");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Merged sync completed");
        assert_eq!(
            entries[0].fields.get("constituent_url"),
            Some(&"/title/99".to_string())
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_redaction_passes_plain_values() {
    assert_eq!(redact_if_sensitive("merged_entry_id", "12"), "12");
    assert_eq!(redact_if_sensitive("title", "Some Title"), "Some Title");
    assert_eq!(redact_if_sensitive("refresh_token", "abc"), "[REDACTED]");
}
