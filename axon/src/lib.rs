#![deny(missing_docs)]
//! # axon: umbrella crate
//!
//! A single import surface for the axon crates. Re-exports the protocol
//! and the implementations behind feature flags, plus a `prelude` for the
//! happy path.
//!
//! ```no_run
//! # #[cfg(all(feature = "router", feature = "journal-memory"))]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use axon::prelude::*;
//!
//! let signal = Signal::builder("user.created").source("/accounts").build()?;
//! assert!(matches("user.*", signal.signal_type())?);
//!
//! axon::journal::global().record(signal, None).await?;
//! # Ok(())
//! # }
//! ```

pub use axon_core;
#[cfg(feature = "bus")]
pub use axon_bus;
#[cfg(feature = "journal")]
pub use axon_journal;
#[cfg(feature = "journal-fs")]
pub use axon_journal_fs;
#[cfg(feature = "journal-memory")]
pub use axon_journal_memory;
#[cfg(feature = "registry")]
pub use axon_registry;
#[cfg(feature = "router")]
pub use axon_router;
#[cfg(feature = "telemetry")]
pub use axon_telemetry;

#[cfg(feature = "journal-memory")]
pub mod journal;

/// Happy-path imports for composing axon systems.
pub mod prelude {
    pub use axon_core::{
        Correlation, DispatchError, DispatchTarget, Dispatcher, DlqEntry, Extension,
        JournalAdapter, JournalError, Signal, SignalId, SubscriptionId, TelemetrySink,
    };

    #[cfg(feature = "router")]
    pub use axon_router::{DispatchOutcome, Pattern, Route, Router, matches};

    #[cfg(feature = "registry")]
    pub use axon_registry::{Registry, Subscription};

    #[cfg(feature = "journal")]
    pub use axon_journal::{Direction, Journal};

    #[cfg(feature = "journal-memory")]
    pub use axon_journal_memory::MemoryJournal;

    #[cfg(feature = "journal-fs")]
    pub use axon_journal_fs::FsJournal;

    #[cfg(feature = "telemetry")]
    pub use axon_telemetry::{TelemetryFanout, TracingSink};

    #[cfg(feature = "bus")]
    pub use axon_bus::{Bus, BusConfig, PublishReport};
}
