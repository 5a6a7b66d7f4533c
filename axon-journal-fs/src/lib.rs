#![deny(missing_docs)]
//! Filesystem-backed implementation of axon-core's [`JournalAdapter`] trait.
//!
//! Every record is a JSON document under the root directory. Keys are
//! percent-encoded into file names. The journal survives process restarts:
//! reopening the same root sees everything written before.

mod files;

use async_trait::async_trait;
use axon_core::error::JournalError;
use axon_core::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use axon_core::journal::{DlqEntry, JournalAdapter, next_inserted_at};
use axon_core::signal::Signal;
use axon_core::telemetry::Metadata;
use chrono::{DateTime, Utc};
use files::{key_to_filename, read_dir_json, read_json, remove_dir, remove_file, write_json};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

const DLQ_DIR_PREFIX: &str = "sub-";

/// Configuration for [`FsJournal`].
#[derive(Debug, Clone)]
pub struct FsJournalConfig {
    /// Directory holding the journal. Created lazily on first write.
    pub root: PathBuf,
    /// Pretty-print documents. On by default.
    pub pretty: bool,
}

impl FsJournalConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pretty: true,
        }
    }
}

/// Filesystem-backed journal.
///
/// Directory layout:
/// ```text
/// root/
///   signals/<signal-id>.json            Signal
///   effects/<cause-id>.json             [effect ids], sorted
///   causes/<effect-id>.json             [cause ids], first recorded first
///   conversations/<conversation-id>.json [signal ids], sorted
///   checkpoints/<subscription-id>.json  consumer value
///   dlq/sub-<subscription-id>/<entry-id>.json DlqEntry
///   dlq-index/<entry-id>.json           owning subscription id
/// ```
///
/// Writes through one `FsJournal` are serialized; two journals opened on
/// the same root at once are not coordinated.
pub struct FsJournal {
    config: FsJournalConfig,
    // Held for every mutation. Stores the newest DLQ timestamp handed out.
    writer: Mutex<Option<DateTime<Utc>>>,
}

impl FsJournal {
    /// Open a journal rooted at `root` with default settings.
    pub fn new(root: &Path) -> Self {
        Self::with_config(FsJournalConfig::new(root))
    }

    /// Open a journal with explicit settings.
    pub fn with_config(config: FsJournalConfig) -> Self {
        debug!(root = %config.root.display(), "opening fs journal");
        Self {
            config,
            writer: Mutex::new(None),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn doc(&self, dir: &str, key: &str) -> PathBuf {
        self.config.root.join(dir).join(key_to_filename(key))
    }

    fn dlq_dir(&self, subscription: &SubscriptionId) -> PathBuf {
        // Same encoding minus the extension, behind a fixed prefix so that
        // no id (not even the empty one) maps onto `dlq/` itself.
        let name = key_to_filename(subscription.as_str());
        let name = name.strip_suffix(".json").unwrap_or(&name);
        self.config.root.join("dlq").join(format!("{DLQ_DIR_PREFIX}{name}"))
    }

    async fn write<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), JournalError> {
        write_json(path, value, self.config.pretty).await
    }
}

#[async_trait]
impl JournalAdapter for FsJournal {
    async fn put_signal(&self, signal: Signal) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        self.write(&self.doc("signals", signal.id().as_str()), &signal)
            .await
    }

    async fn get_signal(&self, id: &SignalId) -> Result<Option<Signal>, JournalError> {
        read_json(&self.doc("signals", id.as_str())).await
    }

    async fn put_cause(&self, cause: &SignalId, effect: &SignalId) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;

        let causes_path = self.doc("causes", effect.as_str());
        let mut causes: Vec<SignalId> = read_json(&causes_path).await?.unwrap_or_default();
        if !causes.contains(cause) {
            causes.push(cause.clone());
            self.write(&causes_path, &causes).await?;
        }

        let effects_path = self.doc("effects", cause.as_str());
        let mut effects: BTreeSet<SignalId> = read_json(&effects_path).await?.unwrap_or_default();
        if effects.insert(effect.clone()) {
            self.write(&effects_path, &effects).await?;
        }
        Ok(())
    }

    async fn get_effects(&self, id: &SignalId) -> Result<BTreeSet<SignalId>, JournalError> {
        Ok(read_json(&self.doc("effects", id.as_str()))
            .await?
            .unwrap_or_default())
    }

    async fn get_cause(&self, id: &SignalId) -> Result<Option<SignalId>, JournalError> {
        let causes: Option<Vec<SignalId>> = read_json(&self.doc("causes", id.as_str())).await?;
        Ok(causes.and_then(|c| c.into_iter().next()))
    }

    async fn put_conversation(
        &self,
        conversation: &ConversationId,
        signal: &SignalId,
    ) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        let path = self.doc("conversations", conversation.as_str());
        let mut members: BTreeSet<SignalId> = read_json(&path).await?.unwrap_or_default();
        if members.insert(signal.clone()) {
            self.write(&path, &members).await?;
        }
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<BTreeSet<SignalId>, JournalError> {
        Ok(read_json(&self.doc("conversations", conversation.as_str()))
            .await?
            .unwrap_or_default())
    }

    async fn put_checkpoint(
        &self,
        subscription: &SubscriptionId,
        value: serde_json::Value,
    ) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        self.write(&self.doc("checkpoints", subscription.as_str()), &value)
            .await
    }

    async fn get_checkpoint(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Option<serde_json::Value>, JournalError> {
        read_json(&self.doc("checkpoints", subscription.as_str())).await
    }

    async fn delete_checkpoint(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        remove_file(&self.doc("checkpoints", subscription.as_str())).await
    }

    async fn put_dlq_entry(
        &self,
        subscription: &SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
    ) -> Result<DlqEntryId, JournalError> {
        let mut last = self.writer.lock().await;
        let entry = DlqEntry {
            id: DlqEntryId::generate(),
            subscription_id: subscription.clone(),
            signal,
            reason,
            metadata,
            inserted_at: next_inserted_at(*last),
        };

        self.write(&self.doc("dlq-index", entry.id.as_str()), subscription)
            .await?;
        let path = self
            .dlq_dir(subscription)
            .join(key_to_filename(entry.id.as_str()));
        self.write(&path, &entry).await?;

        *last = Some(entry.inserted_at);
        Ok(entry.id)
    }

    async fn get_dlq_entries(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<DlqEntry>, JournalError> {
        let mut entries: Vec<DlqEntry> = read_dir_json(&self.dlq_dir(subscription)).await?;
        entries.sort_by(|a, b| (a.inserted_at, &a.id).cmp(&(b.inserted_at, &b.id)));
        Ok(entries)
    }

    async fn delete_dlq_entry(&self, entry: &DlqEntryId) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        let index = self.doc("dlq-index", entry.as_str());
        let Some(subscription) = read_json::<SubscriptionId>(&index).await? else {
            return Ok(());
        };
        remove_file(&self.dlq_dir(&subscription).join(key_to_filename(entry.as_str()))).await?;
        remove_file(&index).await
    }

    async fn clear_dlq(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let _guard = self.writer.lock().await;
        let dir = self.dlq_dir(subscription);
        let entries: Vec<DlqEntry> = read_dir_json(&dir).await?;
        remove_dir(&dir).await?;
        for entry in entries {
            remove_file(&self.doc("dlq-index", entry.id.as_str())).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_journal_implements_journal_adapter() {
        fn _assert_adapter<T: JournalAdapter>() {}
        _assert_adapter::<FsJournal>();
    }

    #[test]
    fn dlq_dirs_are_encoded() {
        let journal = FsJournal::new(Path::new("/tmp/j"));
        assert_eq!(
            journal.dlq_dir(&SubscriptionId::new("a/b")),
            PathBuf::from("/tmp/j/dlq/sub-a%2Fb")
        );
    }

    #[test]
    fn empty_subscription_gets_its_own_dlq_dir() {
        let journal = FsJournal::new(Path::new("/tmp/j"));
        let empty = journal.dlq_dir(&SubscriptionId::new(""));
        assert_eq!(empty, PathBuf::from("/tmp/j/dlq/sub-"));
        assert_ne!(empty, PathBuf::from("/tmp/j/dlq"));
        assert_ne!(empty, journal.dlq_dir(&SubscriptionId::new(".")));
    }

    #[test]
    fn default_config_is_pretty() {
        let config = FsJournalConfig::new("/tmp/j");
        assert!(config.pretty);
        assert_eq!(config.root, PathBuf::from("/tmp/j"));
    }
}
