//! Outcomes of publish and redrive.

use axon_core::id::{DlqEntryId, SignalId, SubscriptionId};

/// A delivery that did not go through.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDelivery {
    /// Subscription whose target failed.
    pub subscription_id: SubscriptionId,
    /// Error text reported by the dispatcher.
    pub reason: String,
    /// Dead-letter entry written for the failure, if dead-lettering is on.
    pub dlq_entry: Option<DlqEntryId>,
    /// Why the dead-letter write itself failed. `dlq_entry` is `None`
    /// whenever this is set.
    pub dead_letter_error: Option<String>,
}

/// What [`Bus::publish`](crate::Bus::publish) did with one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    /// The published signal.
    pub signal_id: SignalId,
    /// Subscriptions that accepted the signal, by id.
    pub delivered: Vec<SubscriptionId>,
    /// Subscriptions that did not, by id.
    pub failed: Vec<FailedDelivery>,
}

impl PublishReport {
    /// Number of subscriptions that matched.
    pub fn matched(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// True when every matching subscription accepted the signal.
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }

    /// Failures that could not be dead-lettered and are therefore lost
    /// unless the caller retries them.
    pub fn unrecorded(&self) -> impl Iterator<Item = &FailedDelivery> {
        self.failed.iter().filter(|f| f.dead_letter_error.is_some())
    }
}

/// What [`Bus::redrive_dlq`](crate::Bus::redrive_dlq) did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedriveReport {
    /// Entries delivered this time and removed from the queue.
    pub redelivered: Vec<DlqEntryId>,
    /// Entries that failed again and are still queued.
    pub remaining: Vec<DlqEntryId>,
}
