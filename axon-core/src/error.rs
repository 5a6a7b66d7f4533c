//! Error types for each protocol.

use thiserror::Error;

/// Signal construction and validation errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// A required attribute was not supplied.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The id was supplied but is empty or contains whitespace.
    #[error("invalid signal id: {0:?}")]
    InvalidId(String),

    /// The type is not a dot-separated list of concrete segments.
    #[error("invalid signal type {signal_type:?}: {reason}")]
    InvalidType {
        /// The rejected type string.
        signal_type: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The source was supplied but is empty.
    #[error("invalid signal source: {0:?}")]
    InvalidSource(String),

    /// An extension namespace or payload is unusable.
    #[error("invalid extension {namespace:?}: {reason}")]
    InvalidExtension {
        /// The namespace involved.
        namespace: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Path pattern compilation errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern string is empty.
    #[error("pattern is empty")]
    Empty,

    /// Two separators with nothing between them, or a leading/trailing separator.
    #[error("pattern {pattern:?} has an empty segment at position {position}")]
    EmptySegment {
        /// The rejected pattern.
        pattern: String,
        /// Zero-based segment index.
        position: usize,
    },

    /// A segment contains characters outside the allowed set, or mixes
    /// wildcard and literal characters.
    #[error("pattern {pattern:?} has invalid segment {segment:?}")]
    InvalidSegment {
        /// The rejected pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
    },

    /// `**` directly followed by another `**`.
    #[error("pattern {0:?} has adjacent multi-segment wildcards")]
    AdjacentMultiWildcard(String),
}

/// Router errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The route's path pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// Priority outside the accepted range.
    #[error("priority {priority} outside {min}..={max}")]
    InvalidPriority {
        /// The rejected priority.
        priority: i32,
        /// Lowest accepted priority.
        min: i32,
        /// Highest accepted priority.
        max: i32,
    },
}

/// Subscription registry errors. A failed registry operation never
/// changes the registry it was called on.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A subscription with this id is already registered.
    #[error("subscription already exists: {0}")]
    AlreadyExists(String),

    /// No subscription with this id.
    #[error("subscription not found: {0}")]
    NotFound(String),

    /// The subscription path failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
}

/// Journal errors.
///
/// Absent keys on reads are NOT errors: adapters return `Ok(None)` or an
/// empty collection. [`JournalError::NotFound`] is for operations that
/// require an existing record.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JournalError {
    /// A record the operation depends on does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of record was looked up ("signal", "dlq entry", ...).
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Recording the edge would break causal ordering or form a cycle.
    #[error("causality violation: {0}")]
    Causality(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Opaque backend failure, passed through unchanged.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl JournalError {
    /// Shorthand for [`JournalError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Delivery errors returned by a [`Dispatcher`](crate::Dispatcher).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatcher does not handle this target kind.
    #[error("unsupported target kind: {0}")]
    Unsupported(String),

    /// The receiver refused the signal (full mailbox, gone away, ...).
    #[error("rejected by {target}: {reason}")]
    Rejected {
        /// Target kind that rejected.
        target: String,
        /// Reason reported by the receiver.
        reason: String,
    },

    /// Delivery failed in transit.
    #[error("delivery failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
