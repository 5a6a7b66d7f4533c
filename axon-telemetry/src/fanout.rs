use axon_core::telemetry::{Measurements, Metadata, TelemetrySink};
use std::sync::Arc;

struct Registered {
    // Empty matches every event.
    prefix: Vec<String>,
    sink: Arc<dyn TelemetrySink>,
}

impl Registered {
    fn wants(&self, event: &[&str]) -> bool {
        self.prefix.len() <= event.len()
            && self.prefix.iter().zip(event).all(|(p, e)| p == e)
    }
}

/// A sink that forwards every event to an ordered list of sinks.
///
/// Sinks are called in the order they were added. A sink added with
/// [`add_filtered`](Self::add_filtered) only sees events whose path starts
/// with its prefix.
#[derive(Default)]
pub struct TelemetryFanout {
    sinks: Vec<Registered>,
}

impl TelemetryFanout {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink that sees every event.
    pub fn add(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(Registered {
            prefix: Vec::new(),
            sink,
        });
    }

    /// Add a sink that only sees events under `prefix`, e.g.
    /// `["axon", "journal", "dlq"]`.
    pub fn add_filtered<I, S>(&mut self, prefix: I, sink: Arc<dyn TelemetrySink>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sinks.push(Registered {
            prefix: prefix.into_iter().map(Into::into).collect(),
            sink,
        });
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when no sinks are registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for TelemetryFanout {
    fn emit(&self, event: &[&str], measurements: &Measurements, metadata: &Metadata) {
        for registered in &self.sinks {
            if registered.wants(event) {
                registered.sink.emit(event, measurements, metadata);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::test_utils::RecordingSink;

    fn emit(fanout: &TelemetryFanout, event: &[&str]) {
        fanout.emit(event, &Measurements::new(), &Metadata::new());
    }

    #[test]
    fn empty_fanout_is_a_noop() {
        let fanout = TelemetryFanout::new();
        assert!(fanout.is_empty());
        emit(&fanout, &["axon", "journal", "signal", "put"]);
    }

    #[test]
    fn forwards_to_every_sink() {
        let a = Arc::new(RecordingSink::new());
        let b = Arc::new(RecordingSink::new());
        let mut fanout = TelemetryFanout::new();
        fanout.add(a.clone());
        fanout.add(b.clone());

        emit(&fanout, &["axon", "journal", "signal", "put"]);

        assert_eq!(fanout.len(), 2);
        assert_eq!(a.names(), vec!["axon.journal.signal.put"]);
        assert_eq!(b.names(), vec!["axon.journal.signal.put"]);
    }

    #[test]
    fn filtered_sink_sees_only_its_prefix() {
        let dlq = Arc::new(RecordingSink::new());
        let mut fanout = TelemetryFanout::new();
        fanout.add_filtered(["axon", "journal", "dlq"], dlq.clone());

        emit(&fanout, &["axon", "journal", "signal", "put"]);
        emit(&fanout, &["axon", "journal", "dlq", "put"]);
        emit(&fanout, &["axon", "journal"]);

        assert_eq!(dlq.names(), vec!["axon.journal.dlq.put"]);
    }

    #[test]
    fn sinks_are_called_in_registration_order() {
        use std::sync::Mutex;

        struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl TelemetrySink for Tagged {
            fn emit(&self, _: &[&str], _: &Measurements, _: &Metadata) {
                self.1.lock().unwrap().push(self.0);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = TelemetryFanout::new();
        fanout.add(Arc::new(Tagged("first", log.clone())));
        fanout.add(Arc::new(Tagged("second", log.clone())));
        fanout.add(Arc::new(Tagged("third", log.clone())));

        emit(&fanout, &["x"]);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
