use async_trait::async_trait;
use axon_bus::{Bus, BusConfig, BusError};
use axon_core::test_utils::{RecordingDispatcher, RecordingSink};
use axon_core::{
    ConversationId, DispatchTarget, DlqEntry, DlqEntryId, JournalAdapter, JournalError, Metadata,
    Signal, SignalId, SubscriptionId,
};
use std::collections::BTreeSet;
use axon_journal::{Direction, Journal};
use axon_journal_memory::MemoryJournal;
use serde_json::json;
use std::sync::Arc;

fn setup(config: BusConfig) -> (Bus, Arc<RecordingDispatcher>, Arc<RecordingSink>) {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let sink = Arc::new(RecordingSink::new());
    let journal = Journal::new(MemoryJournal::new()).with_telemetry(sink.clone());
    (Bus::with_config(journal, dispatcher.clone(), config), dispatcher, sink)
}

async fn subscribe_all(bus: &Bus) {
    bus.subscribe("audit", "**", DispatchTarget::new("audit-log"))
        .await
        .unwrap();
    bus.subscribe("users", "user.*", DispatchTarget::new("user-service"))
        .await
        .unwrap();
    bus.subscribe("welcome", "user.created", DispatchTarget::new("mailer"))
        .await
        .unwrap();
}

#[tokio::test]
async fn publish_delivers_to_every_matching_subscription() {
    let (bus, dispatcher, _) = setup(BusConfig::default());
    subscribe_all(&bus).await;

    let report = bus
        .publish(Signal::builder("user.created").build().unwrap(), None)
        .await
        .unwrap();

    assert_eq!(report.matched(), 3);
    assert!(report.all_delivered());
    // Sequential delivery follows subscription id order.
    assert_eq!(
        dispatcher.delivered_kinds(),
        vec!["audit-log", "user-service", "mailer"]
    );

    let deeper = bus
        .publish(Signal::builder("user.created.extra").build().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(deeper.delivered, vec![SubscriptionId::new("audit")]);
}

#[tokio::test]
async fn failed_delivery_is_dead_lettered_then_redriven() {
    let (bus, dispatcher, sink) = setup(BusConfig::default());
    subscribe_all(&bus).await;
    dispatcher.fail_kind("mailer");

    let signal = Signal::builder("user.created")
        .data(json!({"email": "ada@example.com"}))
        .build()
        .unwrap();
    let report = bus.publish(signal.clone(), None).await.unwrap();

    assert_eq!(report.delivered.len(), 2);
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0];
    assert_eq!(failure.subscription_id, SubscriptionId::new("welcome"));
    assert!(failure.reason.contains("timeout"));

    let welcome = SubscriptionId::new("welcome");
    let entries = bus.journal().get_dlq_entries(&welcome).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(Some(entries[0].id.clone()), failure.dlq_entry);
    assert_eq!(entries[0].signal, signal);
    assert_eq!(entries[0].metadata["target"], json!("mailer"));
    assert!(sink.names().contains(&"axon.journal.dlq.put".to_string()));

    // Still failing: nothing changes.
    let again = bus.redrive_dlq(&welcome).await.unwrap();
    assert!(again.redelivered.is_empty());
    assert_eq!(again.remaining.len(), 1);

    dispatcher.heal_kind("mailer");
    let redriven = bus.redrive_dlq(&welcome).await.unwrap();
    assert_eq!(redriven.redelivered, vec![entries[0].id.clone()]);
    assert!(redriven.remaining.is_empty());
    assert!(bus.journal().get_dlq_entries(&welcome).await.unwrap().is_empty());
    assert_eq!(dispatcher.delivered_kinds().last().unwrap(), "mailer");
}

#[tokio::test]
async fn publish_records_causality_and_conversation() {
    let (bus, _, _) = setup(BusConfig::default());
    subscribe_all(&bus).await;

    let order = Signal::builder("order.placed")
        .id("order-1")
        .subject("checkout-7")
        .build()
        .unwrap();
    bus.publish(order, None).await.unwrap();

    let invoice = Signal::builder("invoice.issued")
        .id("invoice-1")
        .subject("checkout-7")
        .build()
        .unwrap();
    bus.publish(invoice, Some(&"order-1".into())).await.unwrap();

    let chain = bus
        .journal()
        .trace_chain(&"invoice-1".into(), Direction::Backward)
        .await
        .unwrap();
    let ids: Vec<&str> = chain.iter().map(|s| s.id().as_str()).collect();
    assert_eq!(ids, vec!["invoice-1", "order-1"]);

    let convo = bus.journal().conversation(&"checkout-7".into()).await.unwrap();
    assert_eq!(convo.len(), 2);
}

#[tokio::test]
async fn publish_with_unknown_cause_delivers_nothing() {
    let (bus, dispatcher, _) = setup(BusConfig::default());
    subscribe_all(&bus).await;

    let err = bus
        .publish(
            Signal::builder("user.created").build().unwrap(),
            Some(&SignalId::new("missing")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BusError::Journal(JournalError::NotFound { .. })));
    assert!(dispatcher.deliveries().is_empty());
}

#[tokio::test]
async fn concurrent_delivery_reports_every_subscription() {
    let (bus, dispatcher, _) = setup(BusConfig {
        concurrent_delivery: true,
        ..BusConfig::default()
    });
    subscribe_all(&bus).await;
    dispatcher.fail_kind("user-service");

    let report = bus
        .publish(Signal::builder("user.created").build().unwrap(), None)
        .await
        .unwrap();

    assert_eq!(
        report.delivered,
        vec![SubscriptionId::new("audit"), SubscriptionId::new("welcome")]
    );
    assert_eq!(report.failed[0].subscription_id, SubscriptionId::new("users"));
    let mut kinds = dispatcher.delivered_kinds();
    kinds.sort();
    assert_eq!(kinds, vec!["audit-log", "mailer"]);
}

#[tokio::test]
async fn unsubscribe_stops_delivery_but_keeps_checkpoint() {
    let (bus, dispatcher, _) = setup(BusConfig::default());
    subscribe_all(&bus).await;
    let users = SubscriptionId::new("users");
    bus.ack(&users, json!({"seq": 1})).await.unwrap();

    bus.unsubscribe(&users).await.unwrap();
    assert_eq!(bus.subscriptions().await.count(), 2);

    bus.publish(Signal::builder("user.updated").build().unwrap(), None)
        .await
        .unwrap();
    assert_eq!(dispatcher.delivered_kinds(), vec!["audit-log"]);
    assert_eq!(bus.checkpoint(&users).await.unwrap(), Some(json!({"seq": 1})));
}

/// Memory journal whose DLQ writes fail for one subscription.
struct DlqRefusedFor {
    inner: MemoryJournal,
    subscription: SubscriptionId,
}

#[async_trait]
impl JournalAdapter for DlqRefusedFor {
    async fn put_signal(&self, signal: Signal) -> Result<(), JournalError> {
        self.inner.put_signal(signal).await
    }
    async fn get_signal(&self, id: &SignalId) -> Result<Option<Signal>, JournalError> {
        self.inner.get_signal(id).await
    }
    async fn put_cause(&self, cause: &SignalId, effect: &SignalId) -> Result<(), JournalError> {
        self.inner.put_cause(cause, effect).await
    }
    async fn get_effects(&self, id: &SignalId) -> Result<BTreeSet<SignalId>, JournalError> {
        self.inner.get_effects(id).await
    }
    async fn get_cause(&self, id: &SignalId) -> Result<Option<SignalId>, JournalError> {
        self.inner.get_cause(id).await
    }
    async fn put_conversation(&self, c: &ConversationId, s: &SignalId) -> Result<(), JournalError> {
        self.inner.put_conversation(c, s).await
    }
    async fn get_conversation(&self, c: &ConversationId) -> Result<BTreeSet<SignalId>, JournalError> {
        self.inner.get_conversation(c).await
    }
    async fn put_checkpoint(&self, s: &SubscriptionId, v: serde_json::Value) -> Result<(), JournalError> {
        self.inner.put_checkpoint(s, v).await
    }
    async fn get_checkpoint(&self, s: &SubscriptionId) -> Result<Option<serde_json::Value>, JournalError> {
        self.inner.get_checkpoint(s).await
    }
    async fn delete_checkpoint(&self, s: &SubscriptionId) -> Result<(), JournalError> {
        self.inner.delete_checkpoint(s).await
    }
    async fn put_dlq_entry(
        &self,
        subscription: &SubscriptionId,
        signal: Signal,
        reason: String,
        metadata: Metadata,
    ) -> Result<DlqEntryId, JournalError> {
        if *subscription == self.subscription {
            return Err(JournalError::Adapter("disk full".into()));
        }
        self.inner.put_dlq_entry(subscription, signal, reason, metadata).await
    }
    async fn get_dlq_entries(&self, s: &SubscriptionId) -> Result<Vec<DlqEntry>, JournalError> {
        self.inner.get_dlq_entries(s).await
    }
    async fn delete_dlq_entry(&self, e: &DlqEntryId) -> Result<(), JournalError> {
        self.inner.delete_dlq_entry(e).await
    }
    async fn clear_dlq(&self, s: &SubscriptionId) -> Result<(), JournalError> {
        self.inner.clear_dlq(s).await
    }
}

#[tokio::test]
async fn failed_dead_letter_write_does_not_hide_other_outcomes() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let journal = Journal::new(DlqRefusedFor {
        inner: MemoryJournal::new(),
        subscription: SubscriptionId::new("audit"),
    });
    let bus = Bus::new(journal, dispatcher.clone());
    subscribe_all(&bus).await;
    dispatcher.fail_kind("audit-log");
    dispatcher.fail_kind("mailer");

    let report = bus
        .publish(Signal::builder("user.created").build().unwrap(), None)
        .await
        .unwrap();

    assert_eq!(report.delivered, vec![SubscriptionId::new("users")]);
    assert_eq!(report.failed.len(), 2);

    let audit = &report.failed[0];
    assert_eq!(audit.subscription_id, SubscriptionId::new("audit"));
    assert_eq!(audit.dlq_entry, None);
    assert!(audit.dead_letter_error.as_deref().unwrap().contains("disk full"));

    // The failure after the refused write is still dead-lettered.
    let welcome = &report.failed[1];
    assert_eq!(welcome.subscription_id, SubscriptionId::new("welcome"));
    assert!(welcome.dlq_entry.is_some());
    assert_eq!(welcome.dead_letter_error, None);
    assert_eq!(
        bus.journal()
            .get_dlq_entries(&SubscriptionId::new("welcome"))
            .await
            .unwrap()
            .len(),
        1
    );

    let unrecorded: Vec<_> = report.unrecorded().map(|f| f.subscription_id.clone()).collect();
    assert_eq!(unrecorded, vec![SubscriptionId::new("audit")]);
}
