//! The Telemetry interface: synchronous observation of journal mutations.

use std::collections::BTreeMap;

/// Numeric measurements attached to a telemetry event.
pub type Measurements = BTreeMap<String, f64>;

/// Structured metadata attached to a telemetry event (and to DLQ entries).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A sink for `(event path, measurements, metadata)` triples.
///
/// Called synchronously right after a mutation succeeds. Sinks cannot
/// fail the mutation: the method returns nothing, and implementations
/// that talk to slow backends should buffer internally.
///
/// Implementations:
/// - TracingSink: forwards to `tracing` events
/// - TelemetryFanout: forwards to several sinks in order
/// - RecordingSink: captures events (testing)
pub trait TelemetrySink: Send + Sync {
    /// Observe one event. `event` is an ordered list of path segments,
    /// e.g. `["axon", "journal", "signal", "put"]`.
    fn emit(&self, event: &[&str], measurements: &Measurements, metadata: &Metadata);
}
