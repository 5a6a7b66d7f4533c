#![deny(missing_docs)]
//! Hierarchical signal routing for axon.
//!
//! A [`Router`] holds [`Route`]s, `(pattern, priority, predicate, target)`
//! tuples compiled into a segment trie. Given a signal it answers which
//! targets want it and in what order, and can hand the signal to a
//! [`Dispatcher`] for each of them. The router never performs delivery
//! I/O itself and never interprets a [`DispatchTarget`].
//!
//! Ordering: descending priority, then registration order. Listing the
//! same router twice always yields the same order.
//!
//! The router is a plain value. Mutation takes `&mut self`; share it
//! behind a lock or a single owner task when several tasks need it.

mod pattern;
mod trie;

pub use pattern::{Pattern, Segment, WILDCARD_MULTI, WILDCARD_SINGLE, matches};

use axon_core::dispatch::{DispatchTarget, Dispatcher};
use axon_core::error::{DispatchError, PatternError, RouterError};
use axon_core::signal::{SEGMENT_SEPARATOR, Signal};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use trie::Trie;

/// Lowest accepted route priority.
pub const MIN_PRIORITY: i32 = -100;

/// Highest accepted route priority.
pub const MAX_PRIORITY: i32 = 100;

/// Extra filter evaluated against a signal after its path matched.
pub type Predicate = Arc<dyn Fn(&Signal) -> bool + Send + Sync>;

/// A registered `(pattern, priority, predicate, target)` tuple.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    priority: i32,
    predicate: Option<Predicate>,
    target: DispatchTarget,
}

impl Route {
    /// A route with priority 0 and no predicate.
    ///
    /// Fails if `path` is not a valid pattern.
    pub fn new(path: &str, target: DispatchTarget) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::parse(path)?,
            priority: 0,
            predicate: None,
            target,
        })
    }

    /// Set the priority. Checked against
    /// [`MIN_PRIORITY`]`..=`[`MAX_PRIORITY`] when the route is added.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Only select this route when `predicate` returns true.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Signal) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// The path pattern as written.
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Priority; higher goes first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The opaque target descriptor.
    pub fn target(&self) -> &DispatchTarget {
        &self.target
    }

    /// Whether a predicate is attached.
    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether the predicate (if any) accepts `signal`. Does not check the path.
    pub fn accepts(&self, signal: &Signal) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(signal))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.pattern.as_str())
            .field("priority", &self.priority)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .field("target", &self.target)
            .finish()
    }
}

/// What happened when one selected route was dispatched.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Pattern of the route.
    pub path: String,
    /// Priority of the route.
    pub priority: i32,
    /// Target the signal was handed to.
    pub target: DispatchTarget,
    /// Delivery result reported by the dispatcher.
    pub result: Result<(), DispatchError>,
}

/// Compiled route table.
#[derive(Clone, Default)]
pub struct Router {
    routes: BTreeMap<u64, Route>,
    trie: Trie,
    next_seq: u64,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Fails, leaving the router unchanged, if the
    /// priority is out of range.
    pub fn add(&mut self, route: Route) -> Result<(), RouterError> {
        validate_priority(route.priority)?;
        self.insert(route);
        Ok(())
    }

    /// Register several routes at once. Either all are added or none.
    pub fn add_all(&mut self, routes: impl IntoIterator<Item = Route>) -> Result<(), RouterError> {
        let routes: Vec<Route> = routes.into_iter().collect();
        for route in &routes {
            validate_priority(route.priority)?;
        }
        for route in routes {
            self.insert(route);
        }
        Ok(())
    }

    fn insert(&mut self, route: Route) {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!(path = route.path(), priority = route.priority, seq, "route added");
        self.trie.insert(&route.pattern, seq);
        self.routes.insert(seq, route);
    }

    /// Remove every route registered with exactly this pattern string.
    /// Returns how many were removed.
    pub fn remove(&mut self, path: &str) -> usize {
        let before = self.routes.len();
        self.routes.retain(|_, r| r.path() != path);
        let removed = before - self.routes.len();
        if removed > 0 {
            let mut trie = Trie::default();
            for (seq, route) in &self.routes {
                trie.insert(&route.pattern, *seq);
            }
            self.trie = trie;
            debug!(path, removed, "routes removed");
        }
        removed
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All routes, by descending priority then registration order.
    pub fn list(&self) -> Vec<&Route> {
        let mut all: Vec<(u64, &Route)> = self.routes.iter().map(|(s, r)| (*s, r)).collect();
        sort_routes(&mut all);
        all.into_iter().map(|(_, r)| r).collect()
    }

    /// Routes whose pattern matches the concrete `path`, ignoring predicates,
    /// in dispatch order.
    pub fn matching(&self, path: &str) -> Vec<&Route> {
        let parts: Vec<&str> = path.split(SEGMENT_SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Vec::new();
        }
        let mut hits: Vec<(u64, &Route)> = self
            .trie
            .matching(&parts)
            .into_iter()
            .filter_map(|seq| self.routes.get(&seq).map(|r| (seq, r)))
            .collect();
        sort_routes(&mut hits);
        hits.into_iter().map(|(_, r)| r).collect()
    }

    /// Routes selected for `signal`: path matches its type and the
    /// predicate, if any, accepts it. In dispatch order.
    pub fn route(&self, signal: &Signal) -> Vec<&Route> {
        self.matching(signal.signal_type())
            .into_iter()
            .filter(|r| r.accepts(signal))
            .collect()
    }

    /// Deliver `signal` to every selected target, one after another in
    /// priority order. Each delivery is awaited before the next starts,
    /// and a failed delivery does not stop the rest.
    pub async fn dispatch(&self, signal: &Signal, dispatcher: &dyn Dispatcher) -> Vec<DispatchOutcome> {
        let selected = self.route(signal);
        debug!(
            signal_id = %signal.id(),
            signal_type = signal.signal_type(),
            targets = selected.len(),
            "dispatching"
        );

        let mut outcomes = Vec::with_capacity(selected.len());
        for route in selected {
            let result = dispatcher.deliver(&route.target, signal).await;
            if let Err(e) = &result {
                warn!(signal_id = %signal.id(), target = %route.target.kind, error = %e, "delivery failed");
            }
            outcomes.push(DispatchOutcome {
                path: route.path().to_string(),
                priority: route.priority,
                target: route.target.clone(),
                result,
            });
        }
        outcomes
    }

    /// Deliver `signal` to every selected target concurrently.
    ///
    /// No execution order is guaranteed between targets. Outcomes are
    /// still returned in priority order.
    pub async fn dispatch_concurrent(
        &self,
        signal: &Signal,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Vec<DispatchOutcome> {
        let selected = self.route(signal);
        let mut handles = Vec::with_capacity(selected.len());

        for route in &selected {
            let dispatcher = Arc::clone(&dispatcher);
            let target = route.target.clone();
            let signal = signal.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.deliver(&target, &signal).await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (route, handle) in selected.into_iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(DispatchError::Failed(e.to_string())),
            };
            if let Err(e) = &result {
                warn!(signal_id = %signal.id(), target = %route.target.kind, error = %e, "delivery failed");
            }
            outcomes.push(DispatchOutcome {
                path: route.path().to_string(),
                priority: route.priority,
                target: route.target.clone(),
                result,
            });
        }
        outcomes
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.list()).finish()
    }
}

fn validate_priority(priority: i32) -> Result<(), RouterError> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(RouterError::InvalidPriority {
            priority,
            min: MIN_PRIORITY,
            max: MAX_PRIORITY,
        })
    }
}

fn sort_routes(routes: &mut [(u64, &Route)]) {
    routes.sort_by_key(|(seq, r)| (Reverse(r.priority), *seq));
}
