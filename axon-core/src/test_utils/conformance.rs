//! Behavioral checks every [`JournalAdapter`] must pass.
//!
//! Each check namespaces its ids with a random prefix, so the suite can run
//! against a shared or non-empty instance. Checks panic on failure.

use crate::id::{ConversationId, DlqEntryId, SignalId, SubscriptionId};
use crate::journal::JournalAdapter;
use crate::signal::Signal;
use crate::telemetry::Metadata;
use serde_json::json;

/// Run every check against `adapter`.
pub async fn check_adapter(adapter: &dyn JournalAdapter) {
    signal_round_trip(adapter).await;
    float_and_nested_payloads(adapter).await;
    unusual_keys_stay_distinct(adapter).await;
    empty_ids_are_ordinary_keys(adapter).await;
    put_signal_overwrites(adapter).await;
    missing_keys_are_not_errors(adapter).await;
    causal_edges_both_directions(adapter).await;
    earliest_cause_wins(adapter).await;
    conversation_membership(adapter).await;
    checkpoint_lifecycle(adapter).await;
    dlq_entry_round_trip(adapter).await;
    dlq_ordering_and_isolation(adapter).await;
    dlq_delete_is_idempotent(adapter).await;
    dlq_isolation_between_related_ids(adapter).await;
}

fn prefix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn signal(id: &str, ty: &str) -> Signal {
    Signal::builder(ty)
        .id(id)
        .source("/conformance")
        .data(json!({"id": id}))
        .build()
        .unwrap()
}

/// `put_signal(s)` then `get_signal(s.id)` returns `s` unchanged.
pub async fn signal_round_trip(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let s = signal(&format!("{p}-sig"), "conformance.round_trip")
        .put_extension("correlation", {
            let mut m = serde_json::Map::new();
            m.insert("trace_id".into(), json!("t-1"));
            m
        });
    adapter.put_signal(s.clone()).await.unwrap();
    assert_eq!(adapter.get_signal(s.id()).await.unwrap(), Some(s));
}

/// Float and nested payloads come back exactly as written.
pub async fn float_and_nested_payloads(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let s = Signal::builder("conformance.floats")
        .id(format!("{p}-floats"))
        .data(json!({
            "ratio": 1.6180339887498947,
            "tiny": 5e-324,
            "huge": -1.7976931348623157e308,
            "nested": [0.1, {"pi": 3.141592653589793, "list": [[], {}, null]}]
        }))
        .build()
        .unwrap();
    adapter.put_signal(s.clone()).await.unwrap();
    assert_eq!(adapter.get_signal(s.id()).await.unwrap(), Some(s.clone()));

    let sub = SubscriptionId::new(format!("{p}-sub"));
    adapter
        .put_checkpoint(&sub, s.data().clone())
        .await
        .unwrap();
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap().as_ref(), Some(s.data()));
}

/// Ids with separators, escapes and non-ASCII text are stored under their
/// own key and never collide with one another.
pub async fn unusual_keys_stay_distinct(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let suffixes = ["/slash", "%2Fslash", ".dot", "..", "%25", "100%", "ünïcödé", "日本"];
    for (i, suffix) in suffixes.iter().enumerate() {
        let id = format!("{p}{suffix}");
        let s = signal(&id, "conformance.keys");
        adapter.put_signal(s.clone()).await.unwrap();
        adapter
            .put_checkpoint(&SubscriptionId::new(&id), json!(i))
            .await
            .unwrap();
        adapter
            .put_conversation(&ConversationId::new(&id), s.id())
            .await
            .unwrap();
    }
    for (i, suffix) in suffixes.iter().enumerate() {
        let id = format!("{p}{suffix}");
        let s = adapter.get_signal(&SignalId::new(&id)).await.unwrap().unwrap();
        assert_eq!(s.id().as_str(), id);
        assert_eq!(
            adapter.get_checkpoint(&SubscriptionId::new(&id)).await.unwrap(),
            Some(json!(i))
        );
        let members = adapter.get_conversation(&ConversationId::new(&id)).await.unwrap();
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec![SignalId::new(&id)]);
    }
}

/// The empty string is a valid key like any other.
pub async fn empty_ids_are_ordinary_keys(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let empty_sub = SubscriptionId::new("");
    let member = SignalId::new(format!("{p}-member"));

    adapter.put_checkpoint(&empty_sub, json!({"p": p})).await.unwrap();
    assert_eq!(adapter.get_checkpoint(&empty_sub).await.unwrap(), Some(json!({"p": p})));
    adapter.delete_checkpoint(&empty_sub).await.unwrap();
    assert_eq!(adapter.get_checkpoint(&empty_sub).await.unwrap(), None);

    let empty_conv = ConversationId::new("");
    adapter.put_conversation(&empty_conv, &member).await.unwrap();
    assert!(adapter.get_conversation(&empty_conv).await.unwrap().contains(&member));

    let empty_sig = SignalId::new("");
    adapter.put_cause(&empty_sig, &member).await.unwrap();
    assert!(adapter.get_effects(&empty_sig).await.unwrap().contains(&member));
    assert_eq!(adapter.get_cause(&member).await.unwrap(), Some(empty_sig));
}

/// Last write wins on duplicate ids.
pub async fn put_signal_overwrites(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let id = format!("{p}-sig");
    adapter.put_signal(signal(&id, "conformance.first")).await.unwrap();
    let second = signal(&id, "conformance.second");
    adapter.put_signal(second.clone()).await.unwrap();
    assert_eq!(
        adapter.get_signal(&SignalId::new(&id)).await.unwrap(),
        Some(second)
    );
}

/// Reads of absent keys return `None` / empty, never an error.
pub async fn missing_keys_are_not_errors(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let sig = SignalId::new(format!("{p}-missing"));
    let sub = SubscriptionId::new(format!("{p}-sub"));
    assert_eq!(adapter.get_signal(&sig).await.unwrap(), None);
    assert_eq!(adapter.get_cause(&sig).await.unwrap(), None);
    assert!(adapter.get_effects(&sig).await.unwrap().is_empty());
    assert!(
        adapter
            .get_conversation(&ConversationId::new(format!("{p}-conv")))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap(), None);
    assert!(adapter.get_dlq_entries(&sub).await.unwrap().is_empty());
    adapter.delete_checkpoint(&sub).await.unwrap();
    adapter.clear_dlq(&sub).await.unwrap();
}

/// `put_cause(a, b)` makes `b` an effect of `a` and `a` the cause of `b`.
pub async fn causal_edges_both_directions(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let a = signal(&format!("{p}-a"), "conformance.cause");
    let b = signal(&format!("{p}-b"), "conformance.effect");
    adapter.put_signal(a.clone()).await.unwrap();
    adapter.put_cause(a.id(), b.id()).await.unwrap();
    adapter.put_signal(b.clone()).await.unwrap();

    let effects = adapter.get_effects(a.id()).await.unwrap();
    assert_eq!(effects.into_iter().collect::<Vec<_>>(), vec![b.id().clone()]);
    assert_eq!(adapter.get_cause(b.id()).await.unwrap(), Some(a.id().clone()));

    // Recording the same edge twice changes nothing.
    adapter.put_cause(a.id(), b.id()).await.unwrap();
    assert_eq!(adapter.get_effects(a.id()).await.unwrap().len(), 1);
}

/// With several causes, `get_cause` returns the first one recorded.
pub async fn earliest_cause_wins(adapter: &dyn JournalAdapter) {
    let p = prefix();
    // Ids sort opposite to insertion order so a sorted set would fail this.
    let late = SignalId::new(format!("{p}-a-second"));
    let early = SignalId::new(format!("{p}-z-first"));
    let effect = SignalId::new(format!("{p}-effect"));
    adapter.put_cause(&early, &effect).await.unwrap();
    adapter.put_cause(&late, &effect).await.unwrap();
    assert_eq!(adapter.get_cause(&effect).await.unwrap(), Some(early.clone()));
    assert!(adapter.get_effects(&late).await.unwrap().contains(&effect));
    assert!(adapter.get_effects(&early).await.unwrap().contains(&effect));
}

/// Conversations collect member ids as a set.
pub async fn conversation_membership(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let conv = ConversationId::new(format!("{p}-conv"));
    let other = ConversationId::new(format!("{p}-other"));
    let s1 = SignalId::new(format!("{p}-1"));
    let s2 = SignalId::new(format!("{p}-2"));
    adapter.put_conversation(&conv, &s1).await.unwrap();
    adapter.put_conversation(&conv, &s2).await.unwrap();
    adapter.put_conversation(&conv, &s1).await.unwrap();
    adapter.put_conversation(&other, &s2).await.unwrap();

    let members = adapter.get_conversation(&conv).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&s1) && members.contains(&s2));
    assert_eq!(adapter.get_conversation(&other).await.unwrap().len(), 1);
}

/// absent → set → updated → deleted → absent.
pub async fn checkpoint_lifecycle(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let sub = SubscriptionId::new(format!("{p}-sub"));
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap(), None);

    adapter.put_checkpoint(&sub, json!({"seq": 1})).await.unwrap();
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap(), Some(json!({"seq": 1})));

    adapter.put_checkpoint(&sub, json!({"seq": 2})).await.unwrap();
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap(), Some(json!({"seq": 2})));

    adapter.delete_checkpoint(&sub).await.unwrap();
    assert_eq!(adapter.get_checkpoint(&sub).await.unwrap(), None);
    adapter.delete_checkpoint(&sub).await.unwrap();
}

/// A written entry reads back with its generated id and all fields.
pub async fn dlq_entry_round_trip(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let sub = SubscriptionId::new(format!("{p}-sub1"));
    let sig = signal(&format!("{p}-sig"), "conformance.dlq");
    let mut meta = Metadata::new();
    meta.insert("attempt".into(), json!(3));

    let entry_id = adapter
        .put_dlq_entry(&sub, sig.clone(), "timeout".into(), meta.clone())
        .await
        .unwrap();
    let entries = adapter.get_dlq_entries(&sub).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.id, entry_id);
    assert_eq!(entry.subscription_id, sub);
    assert_eq!(entry.signal, sig);
    assert_eq!(entry.reason, "timeout");
    assert_eq!(entry.metadata, meta);
}

/// Entries come back oldest first; clearing one subscription leaves others.
pub async fn dlq_ordering_and_isolation(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let sub_a = SubscriptionId::new(format!("{p}-a"));
    let sub_b = SubscriptionId::new(format!("{p}-b"));
    let mut written = Vec::new();
    for i in 0..5 {
        let sig = signal(&format!("{p}-sig-{i}"), "conformance.dlq");
        written.push(
            adapter
                .put_dlq_entry(&sub_a, sig.clone(), format!("fail-{i}"), Metadata::new())
                .await
                .unwrap(),
        );
        adapter
            .put_dlq_entry(&sub_b, sig, "other".into(), Metadata::new())
            .await
            .unwrap();
    }

    let entries = adapter.get_dlq_entries(&sub_a).await.unwrap();
    assert_eq!(
        entries.iter().map(|e| e.id.clone()).collect::<Vec<_>>(),
        written
    );
    assert!(entries.windows(2).all(|w| w[0].inserted_at <= w[1].inserted_at));

    adapter.clear_dlq(&sub_a).await.unwrap();
    assert!(adapter.get_dlq_entries(&sub_a).await.unwrap().is_empty());
    assert_eq!(adapter.get_dlq_entries(&sub_b).await.unwrap().len(), 5);
}

/// Deleting removes exactly one entry; deleting again is a no-op.
pub async fn dlq_delete_is_idempotent(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let sub = SubscriptionId::new(format!("{p}-sub"));
    let first = adapter
        .put_dlq_entry(&sub, signal(&format!("{p}-1"), "conformance.dlq"), "x".into(), Metadata::new())
        .await
        .unwrap();
    let second = adapter
        .put_dlq_entry(&sub, signal(&format!("{p}-2"), "conformance.dlq"), "y".into(), Metadata::new())
        .await
        .unwrap();

    adapter.delete_dlq_entry(&first).await.unwrap();
    adapter.delete_dlq_entry(&first).await.unwrap();
    adapter
        .delete_dlq_entry(&DlqEntryId::new(format!("{p}-never-written")))
        .await
        .unwrap();

    let remaining = adapter.get_dlq_entries(&sub).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second);
}

/// Clearing one subscription never touches another whose id is a prefix
/// or an extension of it, nor the empty id's queue.
pub async fn dlq_isolation_between_related_ids(adapter: &dyn JournalAdapter) {
    let p = prefix();
    let empty = SubscriptionId::new("");
    let base = SubscriptionId::new(p.clone());
    let longer = SubscriptionId::new(format!("{p}x"));
    let nested = SubscriptionId::new(format!("{p}/x"));
    adapter.clear_dlq(&empty).await.unwrap();

    for (i, sub) in [&empty, &base, &longer, &nested].into_iter().enumerate() {
        adapter
            .put_dlq_entry(
                sub,
                signal(&format!("{p}-iso-{i}"), "conformance.dlq"),
                "timeout".into(),
                Metadata::new(),
            )
            .await
            .unwrap();
    }

    adapter.clear_dlq(&empty).await.unwrap();
    assert!(adapter.get_dlq_entries(&empty).await.unwrap().is_empty());
    for sub in [&base, &longer, &nested] {
        assert_eq!(adapter.get_dlq_entries(sub).await.unwrap().len(), 1, "{sub}");
    }

    adapter.clear_dlq(&base).await.unwrap();
    assert!(adapter.get_dlq_entries(&base).await.unwrap().is_empty());
    assert_eq!(adapter.get_dlq_entries(&longer).await.unwrap().len(), 1);
    assert_eq!(adapter.get_dlq_entries(&nested).await.unwrap().len(), 1);

    // Entries of a cleared queue are gone for good: deleting them is a no-op
    // and leaves the survivors alone.
    let survivor = adapter.get_dlq_entries(&longer).await.unwrap()[0].id.clone();
    adapter.delete_dlq_entry(&survivor).await.unwrap();
    assert!(adapter.get_dlq_entries(&longer).await.unwrap().is_empty());
    assert_eq!(adapter.get_dlq_entries(&nested).await.unwrap().len(), 1);
}
