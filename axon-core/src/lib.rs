//! # axon-core: Protocol types for the axon signal backbone
//!
//! This crate defines the value types and trait boundaries shared by every
//! other axon crate. It carries no storage, routing, or delivery logic of
//! its own.
//!
//! ## The Protocols
//!
//! | Protocol | Types | What it does |
//! |----------|-------|-------------|
//! | ① Signal | [`Signal`], [`Extension`], [`Correlation`] | Immutable event envelope |
//! | ② Dispatch | [`DispatchTarget`], [`Dispatcher`] | Hand a matched signal to a delivery mechanism |
//! | ③ Journal | [`JournalAdapter`], [`DlqEntry`] | Ledger of signals, causality, checkpoints, dead letters |
//!
//! ## The Interfaces
//!
//! | Interface | Types | What it does |
//! |-----------|-------|-------------|
//! | ④ Telemetry | [`TelemetrySink`] | Synchronous observation of journal mutations |
//!
//! ## Design Principle
//!
//! Every protocol trait is operation-defined, not mechanism-defined.
//! [`JournalAdapter::put_signal`] means "make this signal retrievable by id",
//! not "insert into a HashMap" or "write a file". An in-memory ledger, a
//! directory of JSON documents, and a database all implement the same trait,
//! which is what lets call sites stay unchanged when the backend is swapped.
//!
//! ## Dependency Notes
//!
//! Payloads, extension maps, dispatch options, and checkpoint values are
//! `serde_json::Value`. JSON is the wire shape of a signal, so carrying it
//! through the protocol avoids a generic parameter on every trait object.

#![deny(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod extension;
pub mod id;
pub mod journal;
pub mod signal;
pub mod telemetry;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use dispatch::{DispatchTarget, Dispatcher};
pub use error::{DispatchError, JournalError, PatternError, RegistryError, RouterError, SignalError};
pub use extension::{Correlation, Extension, ExtensionMap, Extensions};
pub use id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
pub use journal::{DlqEntry, JournalAdapter};
pub use signal::{Signal, SignalAttrs, SignalBuilder};
pub use telemetry::{Measurements, Metadata, TelemetrySink};
