// crates/partner-sync-core/src/runtime/telemetry.rs
// ============================================================================
// Module: Telemetry Sinks
// Description: No-op and JSON-line telemetry sinks.
// Purpose: Emit one structured record per handled batch and engine event.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! [`JsonLineTelemetry`] serializes every event as one JSON object per line to
//! any writer (stderr, a file, or a buffer in tests). Write failures are
//! swallowed so telemetry never changes a handler outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::BatchEvent;
use crate::core::EngineEvent;
use crate::interfaces::SyncTelemetry;

// ============================================================================
// SECTION: No-op
// ============================================================================

/// Telemetry sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl SyncTelemetry for NoopTelemetry {
    fn record_batch(&self, _event: &BatchEvent) {}

    fn record_engine(&self, _event: &EngineEvent) {}
}

// ============================================================================
// SECTION: JSON Lines
// ============================================================================

/// Telemetry sink that writes JSON lines.
pub struct JsonLineTelemetry<W: Write + Send> {
    /// Output writer for event records.
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineTelemetry<W> {
    /// Creates a JSON-line sink over `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }

    /// Writes one event line.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut writer) = self.writer.lock()
        {
            let _ = writeln!(writer, "{payload}");
            let _ = writer.flush();
        }
    }
}

impl<W: Write + Send> SyncTelemetry for JsonLineTelemetry<W> {
    fn record_batch(&self, event: &BatchEvent) {
        self.write_line(event);
    }

    fn record_engine(&self, event: &EngineEvent) {
        self.write_line(event);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::JsonLineTelemetry;
    use crate::core::BatchEvent;
    use crate::core::BatchOutcome;
    use crate::interfaces::SyncTelemetry;

    #[test]
    fn batch_event_is_one_json_line() {
        let sink = JsonLineTelemetry::new(Vec::new());
        sink.record_batch(&BatchEvent {
            event: "batch_handled",
            timestamp_ms: 1,
            handler: "sync-course",
            signature: Some("sig".to_string()),
            log_id: None,
            record_count: 7,
            chunk_count: 3,
            outcome: BatchOutcome::Applied,
            error_kind: None,
            error: None,
            elapsed_ms: 4,
        });
        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["outcome"], "applied");
        assert_eq!(value["chunk_count"], 3);
    }
}
