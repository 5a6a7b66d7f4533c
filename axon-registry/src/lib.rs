#![deny(missing_docs)]
//! Pure subscription catalog for axon.
//!
//! A [`Registry`] maps subscription ids to `{path, dispatch}` records.
//! Every operation takes `&self`: mutations return a new registry and
//! leave the receiver untouched, and a failed mutation returns an error
//! without producing anything. The registry holds no lock and spawns
//! nothing, so the caller decides how it is shared (single owner loop,
//! `RwLock`, actor mailbox).
//!
//! Path matching is [`axon_router::Pattern::matches`]; the registry adds
//! no priority or target resolution of its own.

use axon_core::dispatch::DispatchTarget;
use axon_core::error::RegistryError;
use axon_core::id::SubscriptionId;
use axon_router::Pattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One registered subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    id: SubscriptionId,
    path: Pattern,
    dispatch: DispatchTarget,
    created_at: DateTime<Utc>,
}

impl Subscription {
    /// Unique id within its registry.
    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// The pattern as registered.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.path
    }

    /// Opaque dispatch configuration.
    pub fn dispatch(&self) -> &DispatchTarget {
        &self.dispatch
    }

    /// When the subscription was registered.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the concrete `path` matches this subscription's pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.path.matches(path)
    }
}

/// Immutable subscription catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that also holds `id → {path, dispatch}`.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] if `id` is taken, or
    /// [`RegistryError::InvalidPattern`] if `path` does not compile.
    pub fn register(
        &self,
        id: impl Into<SubscriptionId>,
        path: &str,
        dispatch: DispatchTarget,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        if self.subscriptions.contains_key(&id) {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }
        let subscription = Subscription {
            id: id.clone(),
            path: Pattern::parse(path)?,
            dispatch,
            created_at: Utc::now(),
        };

        let mut next = self.clone();
        next.subscriptions.insert(id, subscription);
        Ok(next)
    }

    /// A registry without `id`. Fails with [`RegistryError::NotFound`] if absent.
    pub fn unregister(&self, id: &SubscriptionId) -> Result<Self, RegistryError> {
        if !self.subscriptions.contains_key(id) {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        let mut next = self.clone();
        next.subscriptions.remove(id);
        Ok(next)
    }

    /// The subscription registered under `id`.
    pub fn lookup(&self, id: &SubscriptionId) -> Result<&Subscription, RegistryError> {
        self.subscriptions
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Every subscription whose pattern matches the concrete `path`, by id.
    pub fn find_by_path(&self, path: &str) -> Vec<&Subscription> {
        self.subscriptions
            .values()
            .filter(|s| s.matches(path))
            .collect()
    }

    /// Number of subscriptions.
    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }

    /// All subscriptions, by id.
    pub fn all(&self) -> Vec<&Subscription> {
        self.subscriptions.values().collect()
    }
}
