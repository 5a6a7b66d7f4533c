//! Checked causal recording and traversal.

use crate::{Journal, metadata};
use axon_core::error::JournalError;
use axon_core::id::{ConversationId, SignalId};
use axon_core::signal::Signal;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::Instant;
use tracing::debug;

/// Which way [`Journal::trace_chain`] walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From a signal to everything it caused, breadth first.
    Forward,
    /// From a signal up through its earliest recorded causes to the root.
    Backward,
}

impl Journal {
    /// Store `signal` and, if given, the edge `cause → signal`. If the
    /// signal has a subject it also joins the conversation of that name.
    ///
    /// With a cause, fails without writing anything when:
    /// - the cause is not in the journal ([`JournalError::NotFound`])
    /// - the cause is the signal itself, or is already caused by it
    ///   directly or transitively ([`JournalError::Causality`])
    /// - the cause is timestamped after the signal ([`JournalError::Causality`])
    ///
    /// Once validation passes the writes are not atomic: the signal is
    /// stored first, then the edge, then the conversation membership. An
    /// adapter error part way leaves the earlier writes in place. Every
    /// write is an upsert, so calling `record` again with the same
    /// arguments completes the record.
    pub async fn record(&self, signal: Signal, cause: Option<&SignalId>) -> Result<(), JournalError> {
        let started = Instant::now();
        let id = signal.id().clone();

        if let Some(cause_id) = cause {
            self.check_cause(&signal, cause_id).await?;
        }

        let subject = signal.subject().map(ConversationId::new);
        self.put_signal(signal).await?;
        if let Some(cause_id) = cause {
            self.put_cause(cause_id, &id).await?;
        }
        if let Some(conversation) = subject {
            self.put_conversation(&conversation, &id).await?;
        }

        let mut meta = metadata([("signal_id", id.as_str().into())]);
        if let Some(cause_id) = cause {
            meta.insert("cause_id".into(), cause_id.as_str().into());
        }
        self.emit("signal", "record", started, meta);
        Ok(())
    }

    async fn check_cause(&self, signal: &Signal, cause_id: &SignalId) -> Result<(), JournalError> {
        let effect_id = signal.id();
        if cause_id == effect_id {
            return Err(JournalError::Causality(format!(
                "signal {effect_id} cannot cause itself"
            )));
        }

        let cause = self
            .get_signal(cause_id)
            .await?
            .ok_or_else(|| JournalError::not_found("signal", cause_id.as_str()))?;

        if cause.time() > signal.time() {
            return Err(JournalError::Causality(format!(
                "cause {cause_id} at {} is later than effect {effect_id} at {}",
                cause.time(),
                signal.time()
            )));
        }

        if self.descends_from(cause_id, effect_id).await? {
            return Err(JournalError::Causality(format!(
                "{cause_id} already descends from {effect_id}"
            )));
        }
        Ok(())
    }

    /// Whether `target` is reachable from `root` over effect edges.
    async fn descends_from(&self, target: &SignalId, root: &SignalId) -> Result<bool, JournalError> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            for effect in self.get_effects(&next).await? {
                if &effect == target {
                    return Ok(true);
                }
                queue.push_back(effect);
            }
        }
        Ok(false)
    }

    /// The signals on the causal chain through `id`, starting with `id`.
    ///
    /// [`Direction::Forward`] lists every transitive effect breadth first,
    /// siblings in id order. [`Direction::Backward`] follows the earliest
    /// recorded cause up to the root. Edges to signals that were never
    /// stored are followed but the missing signals are left out.
    ///
    /// Fails with [`JournalError::NotFound`] if `id` itself is not stored.
    pub async fn trace_chain(
        &self,
        id: &SignalId,
        direction: Direction,
    ) -> Result<Vec<Signal>, JournalError> {
        debug!(signal_id = %id, ?direction, "trace_chain");
        let start = self
            .get_signal(id)
            .await?
            .ok_or_else(|| JournalError::not_found("signal", id.as_str()))?;

        let mut chain = vec![start];
        let mut seen = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([id.clone()]);

        while let Some(current) = queue.pop_front() {
            let next: BTreeSet<SignalId> = match direction {
                Direction::Forward => self.get_effects(&current).await?,
                Direction::Backward => self.get_cause(&current).await?.into_iter().collect(),
            };
            for next_id in next {
                if !seen.insert(next_id.clone()) {
                    continue;
                }
                if let Some(signal) = self.get_signal(&next_id).await? {
                    chain.push(signal);
                }
                queue.push_back(next_id);
            }
        }
        Ok(chain)
    }

    /// The stored signals of a conversation, ordered by time, then id.
    /// Members whose signal was never stored are left out.
    pub async fn conversation(&self, conversation: &ConversationId) -> Result<Vec<Signal>, JournalError> {
        let mut signals = Vec::new();
        for id in self.get_conversation(conversation).await? {
            if let Some(signal) = self.get_signal(&id).await? {
                signals.push(signal);
            }
        }
        signals.sort_by(|a, b| (a.time(), a.id()).cmp(&(b.time(), b.id())));
        Ok(signals)
    }
}
