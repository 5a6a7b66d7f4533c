//! Commands sent from [`MemoryJournal`](crate::MemoryJournal) handles to the
//! owner thread.
//!
//! ```text
//! handle A ──┐
//!            ├──► mpsc::Sender<JournalCommand> ──► owner thread ──► Ledger
//! handle B ──┘                                   (sequential apply)
//! ```
//!
//! Every command carries a oneshot reply, so a caller observes its own
//! write before its next command is applied.

use crate::ledger::Ledger;
use axon_core::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use axon_core::journal::DlqEntry;
use axon_core::signal::Signal;
use axon_core::telemetry::Metadata;
use std::collections::BTreeSet;
use tokio::sync::oneshot;

#[derive(Debug)]
pub(crate) enum JournalCommand {
    PutSignal {
        signal: Signal,
        reply: oneshot::Sender<()>,
    },
    GetSignal {
        id: SignalId,
        reply: oneshot::Sender<Option<Signal>>,
    },
    PutCause {
        cause: SignalId,
        effect: SignalId,
        reply: oneshot::Sender<()>,
    },
    GetEffects {
        id: SignalId,
        reply: oneshot::Sender<BTreeSet<SignalId>>,
    },
    GetCause {
        id: SignalId,
        reply: oneshot::Sender<Option<SignalId>>,
    },
    PutConversation {
        conversation: ConversationId,
        signal: SignalId,
        reply: oneshot::Sender<()>,
    },
    GetConversation {
        conversation: ConversationId,
        reply: oneshot::Sender<BTreeSet<SignalId>>,
    },
    PutCheckpoint {
        subscription: SubscriptionId,
        value: serde_json::Value,
        reply: oneshot::Sender<()>,
    },
    GetCheckpoint {
        subscription: SubscriptionId,
        reply: oneshot::Sender<Option<serde_json::Value>>,
    },
    DeleteCheckpoint {
        subscription: SubscriptionId,
        reply: oneshot::Sender<()>,
    },
    PutDlqEntry {
        subscription: SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
        reply: oneshot::Sender<DlqEntryId>,
    },
    GetDlqEntries {
        subscription: SubscriptionId,
        reply: oneshot::Sender<Vec<DlqEntry>>,
    },
    DeleteDlqEntry {
        entry: DlqEntryId,
        reply: oneshot::Sender<()>,
    },
    ClearDlq {
        subscription: SubscriptionId,
        reply: oneshot::Sender<()>,
    },
}

impl JournalCommand {
    /// Apply to the ledger and answer the caller. A caller that stopped
    /// waiting is not an error.
    pub(crate) fn apply(self, ledger: &mut Ledger) {
        match self {
            Self::PutSignal { signal, reply } => {
                ledger.put_signal(signal);
                let _ = reply.send(());
            }
            Self::GetSignal { id, reply } => {
                let _ = reply.send(ledger.get_signal(&id));
            }
            Self::PutCause {
                cause,
                effect,
                reply,
            } => {
                ledger.put_cause(cause, effect);
                let _ = reply.send(());
            }
            Self::GetEffects { id, reply } => {
                let _ = reply.send(ledger.get_effects(&id));
            }
            Self::GetCause { id, reply } => {
                let _ = reply.send(ledger.get_cause(&id));
            }
            Self::PutConversation {
                conversation,
                signal,
                reply,
            } => {
                ledger.put_conversation(conversation, signal);
                let _ = reply.send(());
            }
            Self::GetConversation {
                conversation,
                reply,
            } => {
                let _ = reply.send(ledger.get_conversation(&conversation));
            }
            Self::PutCheckpoint {
                subscription,
                value,
                reply,
            } => {
                ledger.put_checkpoint(subscription, value);
                let _ = reply.send(());
            }
            Self::GetCheckpoint {
                subscription,
                reply,
            } => {
                let _ = reply.send(ledger.get_checkpoint(&subscription));
            }
            Self::DeleteCheckpoint {
                subscription,
                reply,
            } => {
                ledger.delete_checkpoint(&subscription);
                let _ = reply.send(());
            }
            Self::PutDlqEntry {
                subscription,
                signal,
                reason,
                metadata,
                reply,
            } => {
                let id = ledger.put_dlq_entry(subscription, signal, reason, metadata);
                let _ = reply.send(id);
            }
            Self::GetDlqEntries {
                subscription,
                reply,
            } => {
                let _ = reply.send(ledger.get_dlq_entries(&subscription));
            }
            Self::DeleteDlqEntry { entry, reply } => {
                ledger.delete_dlq_entry(&entry);
                let _ = reply.send(());
            }
            Self::ClearDlq {
                subscription,
                reply,
            } => {
                ledger.clear_dlq(&subscription);
                let _ = reply.send(());
            }
        }
    }
}
