//! The umbrella surface composes with default features.

use axon::prelude::*;
use axon_core::test_utils::RecordingDispatcher;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn router_registry_and_global_journal_compose() {
    let mut router = Router::new();
    router
        .add(Route::new("order.*", DispatchTarget::new("orders")).unwrap())
        .unwrap();
    router
        .add(
            Route::new("order.**", DispatchTarget::new("audit"))
                .unwrap()
                .with_priority(50),
        )
        .unwrap();

    let registry = Registry::new()
        .register("billing", "order.paid", DispatchTarget::new("billing"))
        .unwrap();

    let placed = Signal::builder("order.placed")
        .source("/shop")
        .subject("cart-42")
        .data(json!({"total": 12}))
        .build()
        .unwrap();
    let paid = Signal::builder("order.paid")
        .source("/shop")
        .subject("cart-42")
        .time(placed.time() + chrono::Duration::seconds(1))
        .build()
        .unwrap();

    let journal = axon::journal::global();
    journal.record(placed.clone(), None).await.unwrap();
    journal.record(paid.clone(), Some(placed.id())).await.unwrap();

    let dispatcher = RecordingDispatcher::new();
    let outcomes = router.dispatch(&paid, &dispatcher).await;
    let kinds: Vec<&str> = outcomes.iter().map(|o| o.target.kind.as_str()).collect();
    assert_eq!(kinds, vec!["audit", "orders"]);

    assert_eq!(registry.find_by_path(paid.signal_type()).len(), 1);
    assert!(registry.find_by_path(placed.signal_type()).is_empty());

    let chain = journal
        .trace_chain(placed.id(), Direction::Forward)
        .await
        .unwrap();
    assert_eq!(chain, vec![placed, paid]);
}

#[test]
fn free_matcher_is_in_the_prelude() {
    assert!(matches("user.**", "user").unwrap());
    assert!(!matches("user.*", "user").unwrap());
}

#[tokio::test]
async fn dispatch_concurrent_takes_a_shared_dispatcher() {
    let mut router = Router::new();
    router
        .add(Route::new("**", DispatchTarget::new("sink")).unwrap())
        .unwrap();
    let dispatcher: Arc<RecordingDispatcher> = Arc::new(RecordingDispatcher::new());
    let outcomes = router
        .dispatch_concurrent(&Signal::builder("a.b").build().unwrap(), dispatcher.clone())
        .await;
    assert!(outcomes[0].result.is_ok());
    assert_eq!(dispatcher.delivered_kinds(), vec!["sink"]);
}
