#![deny(missing_docs)]
//! The journal facade.
//!
//! [`Journal`] wraps any [`JournalAdapter`] and adds what every backend
//! would otherwise repeat:
//!
//! - debug logging of every operation
//! - a telemetry event after every successful mutation
//! - causal recording with validation ([`Journal::record`])
//! - traversal of causal chains and ordered conversations
//!
//! Call sites hold a `Journal` and never name the adapter type, so the
//! backend can be swapped without touching them.
//!
//! # Telemetry events
//!
//! | Event | Metadata |
//! |-------|----------|
//! | `axon.journal.signal.put` | `signal_id`, `signal_type` |
//! | `axon.journal.signal.record` | `signal_id`, `cause_id` (if any) |
//! | `axon.journal.cause.put` | `cause_id`, `effect_id` |
//! | `axon.journal.conversation.put` | `conversation_id`, `signal_id` |
//! | `axon.journal.checkpoint.put` | `subscription_id` |
//! | `axon.journal.checkpoint.delete` | `subscription_id` |
//! | `axon.journal.dlq.put` | `subscription_id`, `entry_id`, `reason` |
//! | `axon.journal.dlq.delete` | `entry_id` |
//! | `axon.journal.dlq.clear` | `subscription_id` |
//!
//! Every event carries the measurement `duration_us`. Reads emit nothing.

mod causality;

pub use causality::Direction;

use axon_core::error::JournalError;
use axon_core::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use axon_core::journal::{DlqEntry, JournalAdapter};
use axon_core::signal::Signal;
use axon_core::telemetry::{Measurements, Metadata, TelemetrySink};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Prefix of every journal telemetry event.
pub const EVENT_PREFIX: [&str; 2] = ["axon", "journal"];

/// Journal facade over a storage adapter. Cheap to clone.
#[derive(Clone)]
pub struct Journal {
    adapter: Arc<dyn JournalAdapter>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl Journal {
    /// Wrap an adapter. No telemetry sink is attached.
    pub fn new(adapter: impl JournalAdapter + 'static) -> Self {
        Self::from_arc(Arc::new(adapter))
    }

    /// Wrap an adapter that is already shared.
    pub fn from_arc(adapter: Arc<dyn JournalAdapter>) -> Self {
        Self {
            adapter,
            telemetry: None,
        }
    }

    /// Attach a telemetry sink, replacing any previous one.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// The underlying adapter.
    pub fn adapter(&self) -> &Arc<dyn JournalAdapter> {
        &self.adapter
    }

    fn emit(&self, record: &str, action: &str, started: Instant, metadata: Metadata) {
        let Some(sink) = &self.telemetry else {
            return;
        };
        let mut measurements = Measurements::new();
        measurements.insert(
            "duration_us".into(),
            started.elapsed().as_micros() as f64,
        );
        let event = [EVENT_PREFIX[0], EVENT_PREFIX[1], record, action];
        sink.emit(&event, &measurements, &metadata);
    }

    /// Store a signal, replacing any previous one with the same id.
    pub async fn put_signal(&self, signal: Signal) -> Result<(), JournalError> {
        let started = Instant::now();
        let meta = metadata([
            ("signal_id", signal.id().as_str().into()),
            ("signal_type", signal.signal_type().into()),
        ]);
        debug!(signal_id = %signal.id(), signal_type = signal.signal_type(), "put_signal");
        self.adapter.put_signal(signal).await?;
        self.emit("signal", "put", started, meta);
        Ok(())
    }

    /// Fetch a signal by id.
    pub async fn get_signal(&self, id: &SignalId) -> Result<Option<Signal>, JournalError> {
        debug!(signal_id = %id, "get_signal");
        self.adapter.get_signal(id).await
    }

    /// Record that `cause` produced `effect`, without validation. See
    /// [`Journal::record`] for the checked variant.
    pub async fn put_cause(&self, cause: &SignalId, effect: &SignalId) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(cause_id = %cause, effect_id = %effect, "put_cause");
        self.adapter.put_cause(cause, effect).await?;
        self.emit(
            "cause",
            "put",
            started,
            metadata([
                ("cause_id", cause.as_str().into()),
                ("effect_id", effect.as_str().into()),
            ]),
        );
        Ok(())
    }

    /// Ids directly caused by `id`.
    pub async fn get_effects(&self, id: &SignalId) -> Result<BTreeSet<SignalId>, JournalError> {
        debug!(signal_id = %id, "get_effects");
        self.adapter.get_effects(id).await
    }

    /// The earliest recorded cause of `id`.
    pub async fn get_cause(&self, id: &SignalId) -> Result<Option<SignalId>, JournalError> {
        debug!(signal_id = %id, "get_cause");
        self.adapter.get_cause(id).await
    }

    /// Add `signal` to a conversation.
    pub async fn put_conversation(
        &self,
        conversation: &ConversationId,
        signal: &SignalId,
    ) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(conversation_id = %conversation, signal_id = %signal, "put_conversation");
        self.adapter.put_conversation(conversation, signal).await?;
        self.emit(
            "conversation",
            "put",
            started,
            metadata([
                ("conversation_id", conversation.as_str().into()),
                ("signal_id", signal.as_str().into()),
            ]),
        );
        Ok(())
    }

    /// Member ids of a conversation, unordered. See
    /// [`Journal::conversation`] for the signals in time order.
    pub async fn get_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<BTreeSet<SignalId>, JournalError> {
        debug!(conversation_id = %conversation, "get_conversation");
        self.adapter.get_conversation(conversation).await
    }

    /// Overwrite the checkpoint of a subscription.
    pub async fn put_checkpoint(
        &self,
        subscription: &SubscriptionId,
        value: Value,
    ) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(subscription_id = %subscription, "put_checkpoint");
        self.adapter.put_checkpoint(subscription, value).await?;
        self.emit(
            "checkpoint",
            "put",
            started,
            metadata([("subscription_id", subscription.as_str().into())]),
        );
        Ok(())
    }

    /// The checkpoint of a subscription.
    pub async fn get_checkpoint(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Option<Value>, JournalError> {
        debug!(subscription_id = %subscription, "get_checkpoint");
        self.adapter.get_checkpoint(subscription).await
    }

    /// Remove a checkpoint. No-op if absent.
    pub async fn delete_checkpoint(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(subscription_id = %subscription, "delete_checkpoint");
        self.adapter.delete_checkpoint(subscription).await?;
        self.emit(
            "checkpoint",
            "delete",
            started,
            metadata([("subscription_id", subscription.as_str().into())]),
        );
        Ok(())
    }

    /// Append a dead-letter entry and return its id.
    pub async fn put_dlq_entry(
        &self,
        subscription: &SubscriptionId,
        signal: Signal,
        reason: impl Into<String>,
        meta: Metadata,
    ) -> Result<DlqEntryId, JournalError> {
        let started = Instant::now();
        let reason = reason.into();
        debug!(subscription_id = %subscription, signal_id = %signal.id(), reason = %reason, "put_dlq_entry");
        let entry = self
            .adapter
            .put_dlq_entry(subscription, signal, reason.clone(), meta)
            .await?;
        self.emit(
            "dlq",
            "put",
            started,
            metadata([
                ("subscription_id", subscription.as_str().into()),
                ("entry_id", entry.as_str().into()),
                ("reason", reason.into()),
            ]),
        );
        Ok(entry)
    }

    /// Dead-letter entries of a subscription, oldest first.
    pub async fn get_dlq_entries(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<DlqEntry>, JournalError> {
        debug!(subscription_id = %subscription, "get_dlq_entries");
        self.adapter.get_dlq_entries(subscription).await
    }

    /// Remove one dead-letter entry. No-op if absent.
    pub async fn delete_dlq_entry(&self, entry: &DlqEntryId) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(entry_id = %entry, "delete_dlq_entry");
        self.adapter.delete_dlq_entry(entry).await?;
        self.emit(
            "dlq",
            "delete",
            started,
            metadata([("entry_id", entry.as_str().into())]),
        );
        Ok(())
    }

    /// Remove every dead-letter entry of one subscription.
    pub async fn clear_dlq(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let started = Instant::now();
        debug!(subscription_id = %subscription, "clear_dlq");
        self.adapter.clear_dlq(subscription).await?;
        self.emit(
            "dlq",
            "clear",
            started,
            metadata([("subscription_id", subscription.as_str().into())]),
        );
        Ok(())
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}

fn metadata<const N: usize>(pairs: [(&str, Value); N]) -> Metadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::test_utils::RecordingSink;
    use axon_journal_memory::MemoryJournal;
    use serde_json::json;

    fn journal_with_sink() -> (Journal, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let journal = Journal::new(MemoryJournal::new()).with_telemetry(sink.clone());
        (journal, sink)
    }

    fn sig(id: &str) -> Signal {
        Signal::builder("user.created").id(id).build().unwrap()
    }

    #[tokio::test]
    async fn mutations_emit_one_event_each() {
        let (journal, sink) = journal_with_sink();
        let sub = SubscriptionId::new("sub1");

        journal.put_signal(sig("s1")).await.unwrap();
        journal.put_cause(&"s1".into(), &"s2".into()).await.unwrap();
        journal.put_conversation(&"c".into(), &"s1".into()).await.unwrap();
        journal.put_checkpoint(&sub, json!(1)).await.unwrap();
        journal.delete_checkpoint(&sub).await.unwrap();
        let entry = journal
            .put_dlq_entry(&sub, sig("s1"), "timeout", Metadata::new())
            .await
            .unwrap();
        journal.delete_dlq_entry(&entry).await.unwrap();
        journal.clear_dlq(&sub).await.unwrap();

        assert_eq!(
            sink.names(),
            vec![
                "axon.journal.signal.put",
                "axon.journal.cause.put",
                "axon.journal.conversation.put",
                "axon.journal.checkpoint.put",
                "axon.journal.checkpoint.delete",
                "axon.journal.dlq.put",
                "axon.journal.dlq.delete",
                "axon.journal.dlq.clear",
            ]
        );
        assert!(
            sink.events()
                .iter()
                .all(|e| e.measurements.contains_key("duration_us"))
        );
    }

    #[tokio::test]
    async fn reads_emit_nothing() {
        let (journal, sink) = journal_with_sink();
        let sub = SubscriptionId::new("sub1");
        journal.get_signal(&"x".into()).await.unwrap();
        journal.get_effects(&"x".into()).await.unwrap();
        journal.get_cause(&"x".into()).await.unwrap();
        journal.get_conversation(&"c".into()).await.unwrap();
        journal.get_checkpoint(&sub).await.unwrap();
        journal.get_dlq_entries(&sub).await.unwrap();
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn metadata_carries_ids() {
        let (journal, sink) = journal_with_sink();
        let sub = SubscriptionId::new("sub1");
        let entry = journal
            .put_dlq_entry(&sub, sig("s1"), "timeout", Metadata::new())
            .await
            .unwrap();

        let event = &sink.events()[0];
        assert_eq!(event.metadata["subscription_id"], json!("sub1"));
        assert_eq!(event.metadata["entry_id"], json!(entry.as_str()));
        assert_eq!(event.metadata["reason"], json!("timeout"));
    }

    #[tokio::test]
    async fn without_sink_mutations_still_succeed() {
        let journal = Journal::new(MemoryJournal::new());
        journal.put_signal(sig("s1")).await.unwrap();
        assert!(journal.get_signal(&"s1".into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_mutation_emits_nothing() {
        struct Broken;

        #[async_trait::async_trait]
        impl JournalAdapter for Broken {
            async fn put_signal(&self, _: Signal) -> Result<(), JournalError> {
                Err(JournalError::Adapter("disk full".into()))
            }
            async fn get_signal(&self, _: &SignalId) -> Result<Option<Signal>, JournalError> {
                Ok(None)
            }
            async fn put_cause(&self, _: &SignalId, _: &SignalId) -> Result<(), JournalError> {
                Ok(())
            }
            async fn get_effects(&self, _: &SignalId) -> Result<BTreeSet<SignalId>, JournalError> {
                Ok(BTreeSet::new())
            }
            async fn get_cause(&self, _: &SignalId) -> Result<Option<SignalId>, JournalError> {
                Ok(None)
            }
            async fn put_conversation(
                &self,
                _: &ConversationId,
                _: &SignalId,
            ) -> Result<(), JournalError> {
                Ok(())
            }
            async fn get_conversation(
                &self,
                _: &ConversationId,
            ) -> Result<BTreeSet<SignalId>, JournalError> {
                Ok(BTreeSet::new())
            }
            async fn put_checkpoint(&self, _: &SubscriptionId, _: Value) -> Result<(), JournalError> {
                Ok(())
            }
            async fn get_checkpoint(&self, _: &SubscriptionId) -> Result<Option<Value>, JournalError> {
                Ok(None)
            }
            async fn delete_checkpoint(&self, _: &SubscriptionId) -> Result<(), JournalError> {
                Ok(())
            }
            async fn put_dlq_entry(
                &self,
                _: &SubscriptionId,
                _: Signal,
                _: String,
                _: Metadata,
            ) -> Result<DlqEntryId, JournalError> {
                Err(JournalError::Adapter("disk full".into()))
            }
            async fn get_dlq_entries(&self, _: &SubscriptionId) -> Result<Vec<DlqEntry>, JournalError> {
                Ok(vec![])
            }
            async fn delete_dlq_entry(&self, _: &DlqEntryId) -> Result<(), JournalError> {
                Ok(())
            }
            async fn clear_dlq(&self, _: &SubscriptionId) -> Result<(), JournalError> {
                Ok(())
            }
        }

        let sink = Arc::new(RecordingSink::new());
        let journal = Journal::new(Broken).with_telemetry(sink.clone());
        let err = journal.put_signal(sig("s1")).await.unwrap_err();
        assert!(matches!(err, JournalError::Adapter(msg) if msg == "disk full"));
        assert!(sink.events().is_empty());
    }
}
