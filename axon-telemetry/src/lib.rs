#![deny(missing_docs)]
//! Telemetry sinks for axon.
//!
//! - [`TracingSink`] turns telemetry events into [`tracing`] spans and
//!   events. Users bring their own subscriber.
//! - [`TelemetryFanout`] forwards each event to an ordered list of sinks.
//!
//! # Usage
//!
//! ```no_run
//! use axon_telemetry::{TelemetryFanout, TracingSink, TracingSinkConfig};
//! use std::sync::Arc;
//!
//! let mut fanout = TelemetryFanout::new();
//! fanout.add(Arc::new(TracingSink::new(TracingSinkConfig {
//!     capture_metadata: true,
//! })));
//! // Pass to Journal::with_telemetry(Arc::new(fanout))
//! ```

mod fanout;
mod tracing_sink;

pub use fanout::TelemetryFanout;
pub use tracing_sink::{TARGET, TracingSink, TracingSinkConfig};
