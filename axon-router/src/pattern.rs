//! Path patterns.
//!
//! Grammar:
//! - segments are separated by `.`
//! - a literal segment is `[A-Za-z0-9_-]+` and matches itself
//! - `*` matches exactly one segment
//! - `**` matches zero or more segments, at any position
//!
//! Matching is anchored at both ends: `user.created` does not match
//! `user.created.extra`, but `user.**` does. `**.**` and partial
//! wildcards such as `user*` are rejected when the pattern is compiled.

use axon_core::error::PatternError;
use axon_core::signal::{SEGMENT_SEPARATOR, is_concrete_segment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token for the single-segment wildcard.
pub const WILDCARD_SINGLE: &str = "*";

/// Token for the multi-segment wildcard.
pub const WILDCARD_MULTI: &str = "**";

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(String),
    /// Matches any one segment.
    Single,
    /// Matches zero or more segments.
    Multi,
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile `raw`, rejecting malformed patterns.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        for (position, part) in raw.split(SEGMENT_SEPARATOR).enumerate() {
            let segment = match part {
                "" => {
                    return Err(PatternError::EmptySegment {
                        pattern: raw.to_string(),
                        position,
                    });
                }
                WILDCARD_SINGLE => Segment::Single,
                WILDCARD_MULTI => {
                    if segments.last() == Some(&Segment::Multi) {
                        return Err(PatternError::AdjacentMultiWildcard(raw.to_string()));
                    }
                    Segment::Multi
                }
                literal if is_concrete_segment(literal) => Segment::Literal(literal.to_string()),
                other => {
                    return Err(PatternError::InvalidSegment {
                        pattern: raw.to_string(),
                        segment: other.to_string(),
                    });
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compiled segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern contains no wildcard.
    pub fn is_concrete(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Whether the concrete `path` matches this pattern.
    ///
    /// Paths with empty segments never match.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split(SEGMENT_SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return false;
        }
        self.matches_segments(&parts)
    }

    /// `next[j]` holds whether `segments[i + 1..]` matches `path[j..]`;
    /// each pass of the outer loop computes the same for `segments[i..]`.
    fn matches_segments(&self, path: &[&str]) -> bool {
        let n = path.len();
        let mut next = vec![false; n + 1];
        next[n] = true;

        for segment in self.segments.iter().rev() {
            let mut current = vec![false; n + 1];
            for j in (0..=n).rev() {
                current[j] = match segment {
                    Segment::Literal(lit) => j < n && path[j] == lit.as_str() && next[j + 1],
                    Segment::Single => j < n && next[j + 1],
                    Segment::Multi => next[j] || (j < n && current[j + 1]),
                };
            }
            next = current;
        }

        next[0]
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> Self {
        p.raw
    }
}

/// Compile `pattern` and test `path` against it.
pub fn matches(pattern: &str, path: &str) -> Result<bool, PatternError> {
    Ok(Pattern::parse(pattern)?.matches(path))
}
