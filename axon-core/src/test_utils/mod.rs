//! Test support shared by adapter and bus crates.
//!
//! Available behind the `test-utils` feature flag.

pub mod conformance;
mod recording_dispatcher;
mod recording_sink;

pub use recording_dispatcher::{Delivery, RecordingDispatcher};
pub use recording_sink::{RecordedEmit, RecordingSink};
