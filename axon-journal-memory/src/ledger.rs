//! The ledger state owned by the journal thread.
//!
//! Plain synchronous data structure; all concurrency is handled by the
//! command queue in front of it.

use axon_core::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use axon_core::journal::{DlqEntry, next_inserted_at};
use axon_core::signal::Signal;
use axon_core::telemetry::Metadata;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    signals: HashMap<SignalId, Signal>,
    effects: HashMap<SignalId, BTreeSet<SignalId>>,
    // Insertion order; the first element is the earliest recorded cause.
    causes: HashMap<SignalId, Vec<SignalId>>,
    conversations: HashMap<ConversationId, BTreeSet<SignalId>>,
    checkpoints: HashMap<SubscriptionId, serde_json::Value>,
    // Appended in `inserted_at` order.
    dlq: HashMap<SubscriptionId, Vec<DlqEntry>>,
    dlq_index: HashMap<DlqEntryId, SubscriptionId>,
    last_inserted_at: Option<DateTime<Utc>>,
}

impl Ledger {
    pub(crate) fn put_signal(&mut self, signal: Signal) {
        self.signals.insert(signal.id().clone(), signal);
    }

    pub(crate) fn get_signal(&self, id: &SignalId) -> Option<Signal> {
        self.signals.get(id).cloned()
    }

    pub(crate) fn put_cause(&mut self, cause: SignalId, effect: SignalId) {
        let causes = self.causes.entry(effect.clone()).or_default();
        if !causes.contains(&cause) {
            causes.push(cause.clone());
        }
        self.effects.entry(cause).or_default().insert(effect);
    }

    pub(crate) fn get_effects(&self, id: &SignalId) -> BTreeSet<SignalId> {
        self.effects.get(id).cloned().unwrap_or_default()
    }

    pub(crate) fn get_cause(&self, id: &SignalId) -> Option<SignalId> {
        self.causes.get(id).and_then(|c| c.first()).cloned()
    }

    pub(crate) fn put_conversation(&mut self, conversation: ConversationId, signal: SignalId) {
        self.conversations
            .entry(conversation)
            .or_default()
            .insert(signal);
    }

    pub(crate) fn get_conversation(&self, conversation: &ConversationId) -> BTreeSet<SignalId> {
        self.conversations
            .get(conversation)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn put_checkpoint(&mut self, subscription: SubscriptionId, value: serde_json::Value) {
        self.checkpoints.insert(subscription, value);
    }

    pub(crate) fn get_checkpoint(&self, subscription: &SubscriptionId) -> Option<serde_json::Value> {
        self.checkpoints.get(subscription).cloned()
    }

    pub(crate) fn delete_checkpoint(&mut self, subscription: &SubscriptionId) {
        self.checkpoints.remove(subscription);
    }

    pub(crate) fn put_dlq_entry(
        &mut self,
        subscription: SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
    ) -> DlqEntryId {
        let inserted_at = next_inserted_at(self.last_inserted_at);
        self.last_inserted_at = Some(inserted_at);

        let id = DlqEntryId::generate();
        self.dlq_index.insert(id.clone(), subscription.clone());
        self.dlq.entry(subscription.clone()).or_default().push(DlqEntry {
            id: id.clone(),
            subscription_id: subscription,
            signal,
            reason,
            metadata,
            inserted_at,
        });
        id
    }

    pub(crate) fn get_dlq_entries(&self, subscription: &SubscriptionId) -> Vec<DlqEntry> {
        self.dlq.get(subscription).cloned().unwrap_or_default()
    }

    pub(crate) fn delete_dlq_entry(&mut self, entry: &DlqEntryId) {
        let Some(subscription) = self.dlq_index.remove(entry) else {
            return;
        };
        if let Some(entries) = self.dlq.get_mut(&subscription) {
            entries.retain(|e| &e.id != entry);
            if entries.is_empty() {
                self.dlq.remove(&subscription);
            }
        }
    }

    pub(crate) fn clear_dlq(&mut self, subscription: &SubscriptionId) {
        if let Some(entries) = self.dlq.remove(subscription) {
            for entry in entries {
                self.dlq_index.remove(&entry.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(id: &str) -> Signal {
        Signal::builder("test.ledger").id(id).build().unwrap()
    }

    #[test]
    fn duplicate_cause_is_recorded_once() {
        let mut l = Ledger::default();
        l.put_cause("a".into(), "b".into());
        l.put_cause("a".into(), "b".into());
        assert_eq!(l.causes[&SignalId::new("b")].len(), 1);
    }

    #[test]
    fn delete_dlq_entry_keeps_index_consistent() {
        let mut l = Ledger::default();
        let sub = SubscriptionId::new("s");
        let first = l.put_dlq_entry(sub.clone(), sig("1"), "x".into(), Metadata::new());
        let second = l.put_dlq_entry(sub.clone(), sig("2"), "y".into(), Metadata::new());

        l.delete_dlq_entry(&first);
        assert!(!l.dlq_index.contains_key(&first));
        assert!(l.dlq_index.contains_key(&second));

        l.delete_dlq_entry(&second);
        assert!(l.dlq.is_empty());
        assert!(l.dlq_index.is_empty());
    }

    #[test]
    fn clear_dlq_drops_index_entries() {
        let mut l = Ledger::default();
        let sub = SubscriptionId::new("s");
        for i in 0..3 {
            l.put_dlq_entry(sub.clone(), sig(&i.to_string()), "x".into(), Metadata::new());
        }
        l.clear_dlq(&sub);
        assert!(l.dlq_index.is_empty());
        assert!(l.get_dlq_entries(&sub).is_empty());
    }

    #[test]
    fn inserted_at_strictly_increases() {
        let mut l = Ledger::default();
        let sub = SubscriptionId::new("s");
        for i in 0..50 {
            l.put_dlq_entry(sub.clone(), sig(&i.to_string()), "x".into(), Metadata::new());
        }
        let entries = l.get_dlq_entries(&sub);
        assert!(entries.windows(2).all(|w| w[0].inserted_at < w[1].inserted_at));
    }
}
