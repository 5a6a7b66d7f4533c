//! The Signal envelope: the immutable event exchanged between producers and consumers.

use crate::error::SignalError;
use crate::extension::{self, Extension, ExtensionMap, Extensions};
use crate::id::SignalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source used when a producer does not name itself.
pub const DEFAULT_SOURCE: &str = "/";

/// Separator between segments of a signal type.
pub const SEGMENT_SEPARATOR: char = '.';

/// An immutable, typed event envelope.
///
/// Wire shape (JSON): `{id, type, source, subject?, time, data, extensions?}`.
///
/// Fields are private: a signal is built once through [`Signal::new`] or
/// [`Signal::builder`] and never changes afterwards. Attaching an extension
/// returns a new value ([`Signal::put_extension`]). Deserialization runs
/// the same validation as construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalAttrs")]
pub struct Signal {
    id: SignalId,
    #[serde(rename = "type")]
    signal_type: String,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    time: DateTime<Utc>,
    data: serde_json::Value,
    #[serde(skip_serializing_if = "Extensions::is_empty")]
    extensions: Extensions,
}

/// Unvalidated signal attributes. Everything except `type` has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalAttrs {
    /// Defaults to a fresh UUIDv7.
    #[serde(default)]
    pub id: Option<SignalId>,
    /// Required. Dot-separated concrete segments, e.g. `"user.created"`.
    #[serde(default, rename = "type")]
    pub signal_type: Option<String>,
    /// Defaults to [`DEFAULT_SOURCE`].
    #[serde(default)]
    pub source: Option<String>,
    /// Optional correlation key. The journal uses it as the conversation id.
    #[serde(default)]
    pub subject: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    /// Defaults to `null`.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Defaults to no extensions.
    #[serde(default)]
    pub extensions: Option<Extensions>,
}

impl TryFrom<SignalAttrs> for Signal {
    type Error = SignalError;

    fn try_from(attrs: SignalAttrs) -> Result<Self, Self::Error> {
        Signal::new(attrs)
    }
}

impl Signal {
    /// Validate `attrs` and fill in defaults.
    pub fn new(attrs: SignalAttrs) -> Result<Self, SignalError> {
        let signal_type = attrs
            .signal_type
            .ok_or(SignalError::MissingField("type"))?;
        validate_type(&signal_type)?;

        let id = match attrs.id {
            Some(id) if id.as_str().is_empty() || id.as_str().chars().any(char::is_whitespace) => {
                return Err(SignalError::InvalidId(id.0));
            }
            Some(id) => id,
            None => SignalId::generate(),
        };

        let source = match attrs.source {
            Some(source) if source.trim().is_empty() => {
                return Err(SignalError::InvalidSource(source));
            }
            Some(source) => source,
            None => DEFAULT_SOURCE.to_string(),
        };

        Ok(Self {
            id,
            signal_type,
            source,
            subject: attrs.subject,
            time: attrs.time.unwrap_or_else(Utc::now),
            data: attrs.data.unwrap_or(serde_json::Value::Null),
            extensions: attrs.extensions.unwrap_or_default(),
        })
    }

    /// Start building a signal of the given type.
    pub fn builder(signal_type: impl Into<String>) -> SignalBuilder {
        SignalBuilder {
            attrs: SignalAttrs {
                signal_type: Some(signal_type.into()),
                ..SignalAttrs::default()
            },
        }
    }

    /// Globally unique id.
    pub fn id(&self) -> &SignalId {
        &self.id
    }

    /// Hierarchical type, e.g. `"agent.child.started"`.
    pub fn signal_type(&self) -> &str {
        &self.signal_type
    }

    /// Producer identifier.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Correlation key, if any.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// When the signal was created.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Payload.
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// All extension namespaces.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// The map stored under `namespace`, if present.
    pub fn get_extension(&self, namespace: &str) -> Option<&ExtensionMap> {
        self.extensions.get(namespace)
    }

    /// A copy of this signal with `namespace` replaced by `data`.
    /// Other namespaces are carried over untouched.
    pub fn put_extension(&self, namespace: impl Into<String>, data: ExtensionMap) -> Signal {
        let mut next = self.clone();
        next.extensions.insert(namespace.into(), data);
        next
    }

    /// Decode the typed extension `E`, if its namespace is present.
    pub fn extension<E: Extension>(&self) -> Result<Option<E>, SignalError> {
        self.get_extension(E::NAMESPACE)
            .map(extension::from_extension_map)
            .transpose()
    }

    /// A copy of this signal carrying `ext` under `E::NAMESPACE`.
    pub fn with_extension<E: Extension>(&self, ext: &E) -> Result<Signal, SignalError> {
        let map = extension::to_extension_map(ext)?;
        Ok(self.put_extension(E::NAMESPACE, map))
    }
}

/// Builder returned by [`Signal::builder`].
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    attrs: SignalAttrs,
}

impl SignalBuilder {
    /// Use an explicit id instead of a generated one.
    pub fn id(mut self, id: impl Into<SignalId>) -> Self {
        self.attrs.id = Some(id.into());
        self
    }

    /// Set the producer identifier.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.attrs.source = Some(source.into());
        self
    }

    /// Set the correlation key.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.attrs.subject = Some(subject.into());
        self
    }

    /// Use an explicit timestamp instead of now.
    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.attrs.time = Some(time);
        self
    }

    /// Set the payload.
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.attrs.data = Some(data);
        self
    }

    /// Attach an extension namespace.
    pub fn extension(mut self, namespace: impl Into<String>, data: ExtensionMap) -> Self {
        self.attrs
            .extensions
            .get_or_insert_with(Extensions::new)
            .insert(namespace.into(), data);
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<Signal, SignalError> {
        Signal::new(self.attrs)
    }
}

/// Whether `segment` is a concrete (non-wildcard) path segment:
/// non-empty ASCII alphanumerics, `_` or `-`.
pub fn is_concrete_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_type(signal_type: &str) -> Result<(), SignalError> {
    let invalid = |reason: &str| SignalError::InvalidType {
        signal_type: signal_type.to_string(),
        reason: reason.to_string(),
    };
    if signal_type.is_empty() {
        return Err(invalid("empty"));
    }
    for segment in signal_type.split(SEGMENT_SEPARATOR) {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if !is_concrete_segment(segment) {
            return Err(invalid(&format!("segment {segment:?} is not concrete")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Correlation;
    use serde_json::json;

    #[test]
    fn builder_fills_defaults() {
        let s = Signal::builder("user.created").build().unwrap();
        assert_eq!(s.signal_type(), "user.created");
        assert_eq!(s.source(), DEFAULT_SOURCE);
        assert!(s.subject().is_none());
        assert_eq!(s.data(), &serde_json::Value::Null);
        assert!(s.extensions().is_empty());
        assert!(!s.id().as_str().is_empty());
    }

    #[test]
    fn missing_type_is_rejected() {
        let err = Signal::new(SignalAttrs::default()).unwrap_err();
        assert_eq!(err, SignalError::MissingField("type"));
    }

    #[test]
    fn malformed_types_are_rejected() {
        for bad in ["", "user..created", ".user", "user.", "user.*", "user created"] {
            let err = Signal::builder(bad).build().unwrap_err();
            assert!(
                matches!(err, SignalError::InvalidType { .. }),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = Signal::builder("a.b").id("").build().unwrap_err();
        assert_eq!(err, SignalError::InvalidId(String::new()));
    }

    #[test]
    fn blank_source_is_rejected() {
        let err = Signal::builder("a.b").source("  ").build().unwrap_err();
        assert!(matches!(err, SignalError::InvalidSource(_)));
    }

    #[test]
    fn wire_shape_uses_type_and_omits_empty_optionals() {
        let s = Signal::builder("a.b")
            .id("sig-1")
            .source("/svc")
            .data(json!({"n": 1}))
            .build()
            .unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "a.b");
        assert_eq!(v["id"], "sig-1");
        assert!(v.get("subject").is_none());
        assert!(v.get("extensions").is_none());
    }

    #[test]
    fn json_round_trip_preserves_signal() {
        let mut ext = ExtensionMap::new();
        ext.insert("k".into(), json!("v"));
        let s = Signal::builder("a.b.c")
            .subject("conv-1")
            .data(json!([1, 2, 3]))
            .extension("custom", ext)
            .build()
            .unwrap();
        let text = serde_json::to_string(&s).unwrap();
        let back: Signal = serde_json::from_str(&text).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn json_round_trip_keeps_floats_exact() {
        let s = Signal::builder("metric.sampled")
            .data(json!({
                "ratio": 1.6180339887498947,
                "tiny": 5e-324,
                "nested": [0.1, -2.5e10, {"pi": 3.141592653589793}]
            }))
            .build()
            .unwrap();
        let text = serde_json::to_string(&s).unwrap();
        let back: Signal = serde_json::from_str(&text).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn deserialization_validates() {
        let result: Result<Signal, _> = serde_json::from_value(json!({"id": "x", "type": "a..b"}));
        assert!(result.is_err());
    }

    #[test]
    fn deserialization_defaults_missing_fields() {
        let s: Signal = serde_json::from_value(json!({"type": "a.b"})).unwrap();
        assert_eq!(s.source(), DEFAULT_SOURCE);
    }

    #[test]
    fn put_extension_is_copy_on_write() {
        let original = Signal::builder("a.b").build().unwrap();
        let mut ext = ExtensionMap::new();
        ext.insert("k".into(), json!(1));
        let updated = original.put_extension("ns", ext);
        assert!(original.get_extension("ns").is_none());
        assert_eq!(updated.get_extension("ns").unwrap()["k"], json!(1));
        assert_eq!(original.id(), updated.id());
    }

    #[test]
    fn namespaces_do_not_clobber_each_other() {
        let mut a = ExtensionMap::new();
        a.insert("x".into(), json!(1));
        let mut b = ExtensionMap::new();
        b.insert("y".into(), json!(2));
        let s = Signal::builder("a.b")
            .build()
            .unwrap()
            .put_extension("first", a.clone())
            .put_extension("second", b);
        assert_eq!(s.get_extension("first"), Some(&a));
        assert_eq!(s.extensions().len(), 2);
    }

    #[test]
    fn typed_extension_round_trip() {
        let corr = Correlation::root();
        let s = Signal::builder("a.b")
            .build()
            .unwrap()
            .with_extension(&corr)
            .unwrap();
        assert_eq!(s.extension::<Correlation>().unwrap(), Some(corr));
    }

    #[test]
    fn typed_extension_absent_is_none() {
        let s = Signal::builder("a.b").build().unwrap();
        assert_eq!(s.extension::<Correlation>().unwrap(), None);
    }

    #[test]
    fn typed_extension_with_wrong_shape_errors() {
        let mut bogus = ExtensionMap::new();
        bogus.insert("trace_id".into(), json!(42));
        let s = Signal::builder("a.b")
            .build()
            .unwrap()
            .put_extension("correlation", bogus);
        assert!(s.extension::<Correlation>().is_err());
    }
}
