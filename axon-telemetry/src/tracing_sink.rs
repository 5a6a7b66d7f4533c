use axon_core::telemetry::{Measurements, Metadata, TelemetrySink};

/// `tracing` target of every event emitted by [`TracingSink`].
pub const TARGET: &str = "axon::telemetry";

/// Configuration for [`TracingSink`].
#[derive(Debug, Clone, Default)]
pub struct TracingSinkConfig {
    /// Whether to include event metadata (ids, reasons) as a field.
    /// Disabled by default: metadata may carry consumer-defined values.
    pub capture_metadata: bool,
}

/// A [`TelemetrySink`] that emits one `tracing` event per telemetry event,
/// inside an `axon.telemetry` span named after the event path.
///
/// # Fields emitted
///
/// | Field | Value |
/// |-------|-------|
/// | `event` | Event path joined with `.` |
/// | `duration_us` | The `duration_us` measurement, if present |
/// | `measurements` | All measurements (debug format) |
/// | `metadata` | All metadata, only with `capture_metadata` |
pub struct TracingSink {
    config: TracingSinkConfig,
}

impl TracingSink {
    /// Create a sink with the given configuration.
    #[must_use]
    pub fn new(config: TracingSinkConfig) -> Self {
        Self { config }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(TracingSinkConfig::default())
    }
}

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &[&str], measurements: &Measurements, metadata: &Metadata) {
        let name = event.join(".");
        let duration_us = measurements.get("duration_us").copied();
        let span = tracing::info_span!(target: TARGET, "axon.telemetry", event = %name);
        span.in_scope(|| {
            if self.config.capture_metadata {
                tracing::debug!(
                    target: TARGET,
                    event = %name,
                    duration_us,
                    measurements = ?measurements,
                    metadata = %serde_json::Value::Object(metadata.clone()),
                    "telemetry"
                );
            } else {
                tracing::debug!(
                    target: TARGET,
                    event = %name,
                    duration_us,
                    measurements = ?measurements,
                    "telemetry"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_does_not_capture_metadata() {
        assert!(!TracingSinkConfig::default().capture_metadata);
    }

    #[test]
    fn emits_without_subscriber() {
        let sink = TracingSink::default();
        sink.emit(&["axon", "journal", "signal", "put"], &Measurements::new(), &Metadata::new());
    }
}
