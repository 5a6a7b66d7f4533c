//! The Journal protocol: the ledger of signals, causality, conversations,
//! checkpoints, and dead letters.

use crate::error::JournalError;
use crate::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use crate::signal::Signal;
use crate::telemetry::Metadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Protocol ③: Journal storage
///
/// What a backing store must provide for one ledger instance.
///
/// Implementations:
/// - MemoryJournal: single-owner in-memory ledger (reference, ephemeral)
/// - FsJournal: one JSON document per key (survives restarts)
/// - database-backed adapters
///
/// Contract shared by every implementation:
/// - A missing key is never an error: reads return `Ok(None)` or an
///   empty collection.
/// - Deletes are idempotent.
/// - `get_cause` returns the earliest recorded cause when several exist.
/// - `get_dlq_entries` is sorted ascending by `inserted_at`, and
///   `inserted_at` strictly increases across one instance.
/// - Backend failures surface as [`JournalError::Adapter`] and are never
///   swallowed.
///
/// Retention is NOT part of this trait. Signals and edges are never
/// expired by the journal itself.
#[async_trait]
pub trait JournalAdapter: Send + Sync {
    /// Store a signal, replacing any previous signal with the same id.
    async fn put_signal(&self, signal: Signal) -> Result<(), JournalError>;

    /// Fetch a signal by id.
    async fn get_signal(&self, id: &SignalId) -> Result<Option<Signal>, JournalError>;

    /// Record that `cause` produced `effect`. Updates both directions.
    async fn put_cause(&self, cause: &SignalId, effect: &SignalId) -> Result<(), JournalError>;

    /// Ids directly caused by `id`.
    async fn get_effects(&self, id: &SignalId) -> Result<BTreeSet<SignalId>, JournalError>;

    /// The (earliest recorded) cause of `id`.
    async fn get_cause(&self, id: &SignalId) -> Result<Option<SignalId>, JournalError>;

    /// Add `signal` to a conversation.
    async fn put_conversation(
        &self,
        conversation: &ConversationId,
        signal: &SignalId,
    ) -> Result<(), JournalError>;

    /// Member ids of a conversation. Unordered by contract.
    async fn get_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<BTreeSet<SignalId>, JournalError>;

    /// Overwrite the checkpoint slot of a subscription.
    async fn put_checkpoint(
        &self,
        subscription: &SubscriptionId,
        value: serde_json::Value,
    ) -> Result<(), JournalError>;

    /// The checkpoint of a subscription.
    async fn get_checkpoint(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Option<serde_json::Value>, JournalError>;

    /// Remove a checkpoint. No-op if absent.
    async fn delete_checkpoint(&self, subscription: &SubscriptionId) -> Result<(), JournalError>;

    /// Append a dead-letter entry and return its freshly generated id.
    async fn put_dlq_entry(
        &self,
        subscription: &SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
    ) -> Result<DlqEntryId, JournalError>;

    /// Dead-letter entries of a subscription, oldest first.
    async fn get_dlq_entries(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<DlqEntry>, JournalError>;

    /// Remove one entry. No-op if absent.
    async fn delete_dlq_entry(&self, entry: &DlqEntryId) -> Result<(), JournalError>;

    /// Remove every entry of one subscription. Other subscriptions are untouched.
    async fn clear_dlq(&self, subscription: &SubscriptionId) -> Result<(), JournalError>;
}

/// A signal that failed delivery or processing for one subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlqEntry {
    /// Generated by the adapter on insert.
    pub id: DlqEntryId,
    /// Subscription whose delivery failed.
    pub subscription_id: SubscriptionId,
    /// The signal as it was when it failed.
    pub signal: Signal,
    /// Failure reason, e.g. `"timeout"`.
    pub reason: String,
    /// Free-form context supplied by the writer.
    #[serde(default)]
    pub metadata: Metadata,
    /// Set by the adapter on insert.
    pub inserted_at: DateTime<Utc>,
}

/// The next DLQ timestamp for an instance whose latest entry was stamped
/// `last`: now, or one microsecond after `last` when the clock has not
/// moved forward.
pub fn next_inserted_at(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + chrono::Duration::microseconds(1),
        _ => now,
    }
}
