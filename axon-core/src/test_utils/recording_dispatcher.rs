//! RecordingDispatcher: captures deliveries and fails on demand.

use crate::dispatch::{DispatchTarget, Dispatcher};
use crate::error::DispatchError;
use crate::signal::Signal;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// A captured delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Where the signal was sent.
    pub target: DispatchTarget,
    /// What was sent.
    pub signal: Signal,
}

/// A dispatcher that records successful deliveries in call order and
/// rejects targets whose kind was marked failing.
#[derive(Default)]
pub struct RecordingDispatcher {
    deliveries: Mutex<Vec<Delivery>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingDispatcher {
    /// Create a dispatcher that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every future delivery to targets of `kind`.
    pub fn fail_kind(&self, kind: impl Into<String>) {
        self.failing.lock().unwrap().insert(kind.into());
    }

    /// Accept deliveries to `kind` again.
    pub fn heal_kind(&self, kind: &str) {
        self.failing.lock().unwrap().remove(kind);
    }

    /// Snapshot of successful deliveries.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Kinds of successful deliveries, in order.
    pub fn delivered_kinds(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|d| d.target.kind)
            .collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn deliver(&self, target: &DispatchTarget, signal: &Signal) -> Result<(), DispatchError> {
        if self.failing.lock().unwrap().contains(&target.kind) {
            return Err(DispatchError::Rejected {
                target: target.kind.clone(),
                reason: "timeout".into(),
            });
        }
        self.deliveries.lock().unwrap().push(Delivery {
            target: target.clone(),
            signal: signal.clone(),
        });
        Ok(())
    }
}
