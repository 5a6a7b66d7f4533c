//! Signal extensions: namespaced metadata attached to a signal.
//!
//! Each namespace owns one JSON object. Collaborators attaching metadata
//! under different namespaces never see each other's keys, and replacing
//! one namespace leaves every other namespace untouched.

use crate::id::SignalId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The data held under one extension namespace.
pub type ExtensionMap = serde_json::Map<String, serde_json::Value>;

/// All extensions of a signal, keyed by namespace.
pub type Extensions = BTreeMap<String, ExtensionMap>;

/// A typed view over one extension namespace.
///
/// Implementors serialize to a JSON object; that object is what gets
/// stored under [`Extension::NAMESPACE`]. See
/// [`Signal::extension`](crate::Signal::extension) and
/// [`Signal::with_extension`](crate::Signal::with_extension).
pub trait Extension: Serialize + DeserializeOwned {
    /// Namespace the extension is stored under.
    const NAMESPACE: &'static str;
}

/// Distributed-tracing correlation carried under the `"correlation"` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    /// Shared by every signal in one trace.
    pub trace_id: String,
    /// Identifies this hop.
    pub span_id: String,
    /// Span of the hop that produced this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    /// Signal whose processing produced this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<SignalId>,
}

impl Extension for Correlation {
    const NAMESPACE: &'static str = "correlation";
}

impl Correlation {
    /// Start a new trace.
    pub fn root() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
            parent_span_id: None,
            causation_id: None,
        }
    }

    /// Continue `parent`'s trace for a signal caused by `cause`.
    pub fn child_of(parent: &Correlation, cause: &SignalId) -> Self {
        Self {
            trace_id: parent.trace_id.clone(),
            span_id: new_span_id(),
            parent_span_id: Some(parent.span_id.clone()),
            causation_id: Some(cause.clone()),
        }
    }
}

fn new_span_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

pub(crate) fn to_extension_map<E: Extension>(ext: &E) -> Result<ExtensionMap, crate::SignalError> {
    match serde_json::to_value(ext) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(crate::SignalError::InvalidExtension {
            namespace: E::NAMESPACE.to_string(),
            reason: format!("expected a JSON object, got {other}"),
        }),
        Err(e) => Err(crate::SignalError::Serialization(e.to_string())),
    }
}

pub(crate) fn from_extension_map<E: Extension>(map: &ExtensionMap) -> Result<E, crate::SignalError> {
    serde_json::from_value(serde_json::Value::Object(map.clone())).map_err(|e| {
        crate::SignalError::InvalidExtension {
            namespace: E::NAMESPACE.to_string(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        let c = Correlation::root();
        assert_eq!(c.trace_id.len(), 32);
        assert_eq!(c.span_id.len(), 16);
        assert!(c.parent_span_id.is_none());
        assert!(c.causation_id.is_none());
    }

    #[test]
    fn child_keeps_trace_and_links_parent_span() {
        let root = Correlation::root();
        let child = Correlation::child_of(&root, &SignalId::new("sig-1"));
        assert_eq!(child.trace_id, root.trace_id);
        assert_ne!(child.span_id, root.span_id);
        assert_eq!(child.parent_span_id.as_deref(), Some(root.span_id.as_str()));
        assert_eq!(child.causation_id, Some(SignalId::new("sig-1")));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let c = Correlation {
            trace_id: "t".into(),
            span_id: "s".into(),
            parent_span_id: None,
            causation_id: None,
        };
        let map = to_extension_map(&c).unwrap();
        assert_eq!(map.len(), 2);
    }
}
