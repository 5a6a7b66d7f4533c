#![deny(missing_docs)]
//! In-memory implementation of axon-core's [`JournalAdapter`] trait.
//!
//! One owner thread holds the ledger and applies commands from a bounded
//! queue one at a time. [`MemoryJournal`] is a cheap clonable handle to
//! that queue; every clone talks to the same ledger. Writes from one
//! caller are applied in the order they were sent, and a read observes
//! every write whose reply has already been received.
//!
//! The owner is a plain OS thread, not a runtime task, so a journal may
//! be created outside any runtime and shared between runtimes. It stops
//! when the last handle is dropped. Nothing is persisted.

mod command;
mod ledger;

use async_trait::async_trait;
use axon_core::error::JournalError;
use axon_core::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use axon_core::journal::{DlqEntry, JournalAdapter};
use axon_core::signal::Signal;
use axon_core::telemetry::Metadata;
use command::JournalCommand;
use ledger::Ledger;
use std::collections::BTreeSet;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Default bound of the command queue.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Configuration for [`MemoryJournal`].
#[derive(Debug, Clone)]
pub struct MemoryJournalConfig {
    /// Commands that may wait in the queue before senders are held back.
    /// Values below 1 are treated as 1.
    pub mailbox_capacity: usize,
}

impl Default for MemoryJournalConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

/// Handle to a single-owner in-memory ledger.
///
/// Suitable for tests, prototyping, and single-process deployments where
/// the journal does not need to survive a restart.
#[derive(Debug, Clone)]
pub struct MemoryJournal {
    commands: mpsc::Sender<JournalCommand>,
}

impl MemoryJournal {
    /// Start an empty ledger with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryJournalConfig::default())
    }

    /// Start an empty ledger.
    pub fn with_config(config: MemoryJournalConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let spawned = std::thread::Builder::new()
            .name("axon-journal-memory".into())
            .spawn(move || run(rx));
        if let Err(e) = spawned {
            // The receiver went down with the closure; every call on this
            // handle reports the owner as stopped.
            error!(error = %e, "failed to start memory journal owner");
        }
        Self { commands: tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> JournalCommand,
    ) -> Result<T, JournalError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| owner_stopped())?;
        response.await.map_err(|_| owner_stopped())
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

fn owner_stopped() -> JournalError {
    JournalError::Adapter("memory journal owner stopped".into())
}

/// Owner loop: apply commands until every handle is gone.
fn run(mut commands: mpsc::Receiver<JournalCommand>) {
    info!("memory journal started");
    let mut ledger = Ledger::default();
    while let Some(command) = commands.blocking_recv() {
        command.apply(&mut ledger);
    }
    info!("memory journal stopped");
}

#[async_trait]
impl JournalAdapter for MemoryJournal {
    async fn put_signal(&self, signal: Signal) -> Result<(), JournalError> {
        self.request(|reply| JournalCommand::PutSignal { signal, reply })
            .await
    }

    async fn get_signal(&self, id: &SignalId) -> Result<Option<Signal>, JournalError> {
        let id = id.clone();
        self.request(|reply| JournalCommand::GetSignal { id, reply })
            .await
    }

    async fn put_cause(&self, cause: &SignalId, effect: &SignalId) -> Result<(), JournalError> {
        let (cause, effect) = (cause.clone(), effect.clone());
        self.request(|reply| JournalCommand::PutCause {
            cause,
            effect,
            reply,
        })
        .await
    }

    async fn get_effects(&self, id: &SignalId) -> Result<BTreeSet<SignalId>, JournalError> {
        let id = id.clone();
        self.request(|reply| JournalCommand::GetEffects { id, reply })
            .await
    }

    async fn get_cause(&self, id: &SignalId) -> Result<Option<SignalId>, JournalError> {
        let id = id.clone();
        self.request(|reply| JournalCommand::GetCause { id, reply })
            .await
    }

    async fn put_conversation(
        &self,
        conversation: &ConversationId,
        signal: &SignalId,
    ) -> Result<(), JournalError> {
        let (conversation, signal) = (conversation.clone(), signal.clone());
        self.request(|reply| JournalCommand::PutConversation {
            conversation,
            signal,
            reply,
        })
        .await
    }

    async fn get_conversation(
        &self,
        conversation: &ConversationId,
    ) -> Result<BTreeSet<SignalId>, JournalError> {
        let conversation = conversation.clone();
        self.request(|reply| JournalCommand::GetConversation {
            conversation,
            reply,
        })
        .await
    }

    async fn put_checkpoint(
        &self,
        subscription: &SubscriptionId,
        value: serde_json::Value,
    ) -> Result<(), JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::PutCheckpoint {
            subscription,
            value,
            reply,
        })
        .await
    }

    async fn get_checkpoint(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Option<serde_json::Value>, JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::GetCheckpoint {
            subscription,
            reply,
        })
        .await
    }

    async fn delete_checkpoint(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::DeleteCheckpoint {
            subscription,
            reply,
        })
        .await
    }

    async fn put_dlq_entry(
        &self,
        subscription: &SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
    ) -> Result<DlqEntryId, JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::PutDlqEntry {
            subscription,
            signal,
            reason,
            metadata,
            reply,
        })
        .await
    }

    async fn get_dlq_entries(
        &self,
        subscription: &SubscriptionId,
    ) -> Result<Vec<DlqEntry>, JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::GetDlqEntries {
            subscription,
            reply,
        })
        .await
    }

    async fn delete_dlq_entry(&self, entry: &DlqEntryId) -> Result<(), JournalError> {
        let entry = entry.clone();
        self.request(|reply| JournalCommand::DeleteDlqEntry { entry, reply })
            .await
    }

    async fn clear_dlq(&self, subscription: &SubscriptionId) -> Result<(), JournalError> {
        let subscription = subscription.clone();
        self.request(|reply| JournalCommand::ClearDlq {
            subscription,
            reply,
        })
        .await
    }
}
