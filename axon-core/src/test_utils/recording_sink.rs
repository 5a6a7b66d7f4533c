//! RecordingSink: keeps every telemetry event for inspection in tests.

use crate::telemetry::{Measurements, Metadata, TelemetrySink};
use std::sync::Mutex;

/// A recorded telemetry event.
#[derive(Debug, Clone)]
pub struct RecordedEmit {
    /// Event path joined with `.`.
    pub event: String,
    /// Measurements as emitted.
    pub measurements: Measurements,
    /// Metadata as emitted.
    pub metadata: Metadata,
}

/// A sink that records every event. Use `.events()` to inspect.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEmit>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<RecordedEmit> {
        self.events.lock().unwrap().clone()
    }

    /// Event names only, in emission order.
    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: &[&str], measurements: &Measurements, metadata: &Metadata) {
        self.events.lock().unwrap().push(RecordedEmit {
            event: event.join("."),
            measurements: measurements.clone(),
            metadata: metadata.clone(),
        });
    }
}
