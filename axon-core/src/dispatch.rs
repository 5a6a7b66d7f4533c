//! The Dispatch protocol: handing a matched signal to a delivery mechanism.

use crate::error::DispatchError;
use crate::signal::Signal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque `(kind, options)` descriptor of where a signal should go.
///
/// Routers and registries store and return targets but never interpret
/// them. Only a [`Dispatcher`] knows what `"mailbox"`, `"pubsub"` or
/// `"http"` mean and which options each needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchTarget {
    /// Delivery mechanism name.
    pub kind: String,
    /// Mechanism-specific options.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl DispatchTarget {
    /// A target with no options.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: serde_json::Value::Null,
        }
    }

    /// A target with options.
    pub fn with_options(kind: impl Into<String>, options: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            options,
        }
    }
}

/// Protocol ②: Dispatch
///
/// Delivers one signal to one target. Implementations own the actual I/O:
/// a process mailbox, a network publish, a broadcast channel.
///
/// Implementations:
/// - RecordingDispatcher: captures deliveries (testing)
/// - mailbox/channel dispatchers living next to the consumer runtime
/// - network publishers living next to the transport
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver `signal` to `target`.
    async fn deliver(&self, target: &DispatchTarget, signal: &Signal) -> Result<(), DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_serde_defaults_options() {
        let t: DispatchTarget = serde_json::from_value(json!({"kind": "noop"})).unwrap();
        assert_eq!(t, DispatchTarget::new("noop"));
    }

    #[test]
    fn target_with_options() {
        let t = DispatchTarget::with_options("mailbox", json!({"pid": 7}));
        assert_eq!(t.options["pid"], 7);
    }
}
