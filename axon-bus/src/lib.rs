#![deny(missing_docs)]
//! In-process signal bus for axon.
//!
//! [`Bus`] ties the pieces together:
//!
//! ```text
//! publish(signal) ──► Journal::record ──► Registry::find_by_path ──► Dispatcher::deliver
//!                                                                        │ failure
//!                                                                        ▼
//!                                                              Journal::put_dlq_entry
//! ```
//!
//! The registry is a pure value kept behind an async `RwLock`: subscribe
//! and unsubscribe swap in the new value, publish works on a snapshot. The
//! bus never interprets dispatch targets; the [`Dispatcher`] does.

mod error;
mod report;

pub use error::BusError;
pub use report::{FailedDelivery, PublishReport, RedriveReport};

use axon_core::dispatch::{DispatchTarget, Dispatcher};
use axon_core::error::DispatchError;
use axon_core::id::{SignalId, SubscriptionId};
use axon_core::signal::Signal;
use axon_core::telemetry::Metadata;
use axon_journal::Journal;
use axon_registry::{Registry, Subscription};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Configuration for [`Bus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Record every published signal (and its cause) in the journal before
    /// delivery. On by default.
    pub record_signals: bool,
    /// Write a DLQ entry for every failed delivery. On by default.
    pub dead_letter_on_failure: bool,
    /// Deliver to all matching subscriptions at once instead of one after
    /// another. Off by default.
    pub concurrent_delivery: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            record_signals: true,
            dead_letter_on_failure: true,
            concurrent_delivery: false,
        }
    }
}

/// In-process publish/subscribe over a [`Registry`], a [`Journal`] and a
/// [`Dispatcher`].
pub struct Bus {
    registry: RwLock<Registry>,
    journal: Journal,
    dispatcher: Arc<dyn Dispatcher>,
    config: BusConfig,
}

impl Bus {
    /// A bus with no subscriptions and the default configuration.
    pub fn new(journal: Journal, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_config(journal, dispatcher, BusConfig::default())
    }

    /// A bus with no subscriptions.
    pub fn with_config(journal: Journal, dispatcher: Arc<dyn Dispatcher>, config: BusConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            journal,
            dispatcher,
            config,
        }
    }

    /// The journal this bus records into.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Register a subscription. Fails if the id is taken or the path is
    /// not a valid pattern.
    pub async fn subscribe(
        &self,
        id: impl Into<SubscriptionId>,
        path: &str,
        dispatch: DispatchTarget,
    ) -> Result<Subscription, BusError> {
        let id = id.into();
        let mut registry = self.registry.write().await;
        let next = registry.register(id.clone(), path, dispatch)?;
        let subscription = next.lookup(&id)?.clone();
        *registry = next;
        info!(subscription_id = %id, path, "subscribed");
        Ok(subscription)
    }

    /// Remove a subscription. Its checkpoint and DLQ entries stay in the
    /// journal until cleared explicitly.
    pub async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), BusError> {
        let mut registry = self.registry.write().await;
        let next = registry.unregister(id)?;
        *registry = next;
        info!(subscription_id = %id, "unsubscribed");
        Ok(())
    }

    /// Snapshot of the current subscriptions.
    pub async fn subscriptions(&self) -> Registry {
        self.registry.read().await.clone()
    }

    /// Publish a signal, optionally as an effect of `cause`.
    ///
    /// Records the signal first (when configured), then delivers it to
    /// every subscription whose pattern matches its type. A journal error
    /// while recording aborts the publish before anything is delivered.
    /// Delivery failures are reported and dead-lettered; a failed
    /// dead-letter write is reported on its [`FailedDelivery`] and does not
    /// stop the remaining failures from being dead-lettered.
    pub async fn publish(&self, signal: Signal, cause: Option<&SignalId>) -> Result<PublishReport, BusError> {
        if self.config.record_signals {
            self.journal.record(signal.clone(), cause).await?;
        }

        let matched: Vec<Subscription> = {
            let registry = self.registry.read().await;
            registry
                .find_by_path(signal.signal_type())
                .into_iter()
                .cloned()
                .collect()
        };
        debug!(
            signal_id = %signal.id(),
            signal_type = signal.signal_type(),
            matched = matched.len(),
            "publishing"
        );

        let results = self.deliver_all(&signal, &matched).await;

        let mut report = PublishReport {
            signal_id: signal.id().clone(),
            delivered: Vec::new(),
            failed: Vec::new(),
        };
        for (subscription, result) in matched.iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(subscription.id().clone()),
                Err(e) => {
                    let failure = self.dead_letter(subscription, &signal, e).await;
                    report.failed.push(failure);
                }
            }
        }
        Ok(report)
    }

    async fn deliver_all(&self, signal: &Signal, matched: &[Subscription]) -> Vec<Result<(), DispatchError>> {
        if !self.config.concurrent_delivery {
            let mut results = Vec::with_capacity(matched.len());
            for subscription in matched {
                results.push(self.dispatcher.deliver(subscription.dispatch(), signal).await);
            }
            return results;
        }

        let mut handles = Vec::with_capacity(matched.len());
        for subscription in matched {
            let dispatcher = Arc::clone(&self.dispatcher);
            let target = subscription.dispatch().clone();
            let signal = signal.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.deliver(&target, &signal).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(Err(DispatchError::Failed(e.to_string()))),
            }
        }
        results
    }

    async fn dead_letter(
        &self,
        subscription: &Subscription,
        signal: &Signal,
        err: DispatchError,
    ) -> FailedDelivery {
        let reason = err.to_string();
        warn!(
            subscription_id = %subscription.id(),
            signal_id = %signal.id(),
            reason = %reason,
            "delivery failed"
        );

        let mut failure = FailedDelivery {
            subscription_id: subscription.id().clone(),
            reason,
            dlq_entry: None,
            dead_letter_error: None,
        };
        if !self.config.dead_letter_on_failure {
            return failure;
        }

        let mut meta = Metadata::new();
        meta.insert("target".into(), subscription.dispatch().kind.clone().into());
        meta.insert("path".into(), subscription.path().into());
        match self
            .journal
            .put_dlq_entry(subscription.id(), signal.clone(), failure.reason.clone(), meta)
            .await
        {
            Ok(entry) => {
                warn!(subscription_id = %subscription.id(), entry_id = %entry, "dead-lettered");
                failure.dlq_entry = Some(entry);
            }
            Err(e) => {
                error!(subscription_id = %subscription.id(), signal_id = %signal.id(), error = %e, "dead-letter write failed");
                failure.dead_letter_error = Some(e.to_string());
            }
        }
        failure
    }

    /// Record that `subscription` has processed everything up to `checkpoint`.
    pub async fn ack(&self, subscription: &SubscriptionId, checkpoint: serde_json::Value) -> Result<(), BusError> {
        self.journal.put_checkpoint(subscription, checkpoint).await?;
        Ok(())
    }

    /// The last acknowledged checkpoint of `subscription`.
    pub async fn checkpoint(&self, subscription: &SubscriptionId) -> Result<Option<serde_json::Value>, BusError> {
        Ok(self.journal.get_checkpoint(subscription).await?)
    }

    /// Try every dead-lettered signal of `subscription` again, oldest first,
    /// against its current dispatch target. Entries that go through are
    /// deleted; the rest stay queued unchanged.
    ///
    /// Fails with [`RegistryError::NotFound`](axon_core::RegistryError::NotFound)
    /// if the subscription is no longer registered.
    pub async fn redrive_dlq(&self, subscription: &SubscriptionId) -> Result<RedriveReport, BusError> {
        let target = {
            let registry = self.registry.read().await;
            registry.lookup(subscription)?.dispatch().clone()
        };

        let mut report = RedriveReport::default();
        for entry in self.journal.get_dlq_entries(subscription).await? {
            match self.dispatcher.deliver(&target, &entry.signal).await {
                Ok(()) => {
                    self.journal.delete_dlq_entry(&entry.id).await?;
                    report.redelivered.push(entry.id);
                }
                Err(e) => {
                    debug!(subscription_id = %subscription, entry_id = %entry.id, error = %e, "redrive failed");
                    report.remaining.push(entry.id);
                }
            }
        }
        info!(
            subscription_id = %subscription,
            redelivered = report.redelivered.len(),
            remaining = report.remaining.len(),
            "dlq redriven"
        );
        Ok(report)
    }
}
