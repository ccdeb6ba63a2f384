//! Invariant 8: a successful `chat` fires exactly one `RouteEvent`; a
//! failed `chat` fires none; a panicking callback must not affect the
//! returned response.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use llm_router::RouterConfig;
use llm_router_core::{ChatMessage, OnRouteHook, Request};

use common::{spec, MockAdapter};

#[tokio::test]
async fn successful_chat_fires_exactly_one_event() {
    let fired = Arc::new(AtomicU32::new(0));
    let fired_clone = fired.clone();
    let hook = OnRouteHook::new(move |_event| {
        let fired = fired_clone.clone();
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    });

    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000), "hi");
    let config = RouterConfig::builder().provider(a).on_route(hook).build();
    let router = llm_router::LLMRouter::new(config);

    router
        .chat(Request::builder(vec![ChatMessage::user("hi")]).build().unwrap())
        .await
        .unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_chat_fires_no_event() {
    let fired = Arc::new(AtomicU32::new(0));
    let fired_clone = fired.clone();
    let hook = OnRouteHook::new(move |_event| {
        let fired = fired_clone.clone();
        async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    });

    let a = MockAdapter::always_fails(spec("a", 100, 50_000), "down");
    let config = RouterConfig::builder().provider(a).on_route(hook).build();
    let router = llm_router::LLMRouter::new(config);

    let _ = router
        .chat(Request::builder(vec![ChatMessage::user("hi")]).build().unwrap())
        .await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_hook_does_not_affect_the_returned_response() {
    let hook = OnRouteHook::new(|_event| async move {
        panic!("misbehaving observability backend");
    });

    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000), "hi from a");
    let config = RouterConfig::builder().provider(a).on_route(hook).build();
    let router = llm_router::LLMRouter::new(config);

    let response = router
        .chat(Request::builder(vec![ChatMessage::user("hi")]).build().unwrap())
        .await
        .unwrap();
    assert_eq!(response.provider, "a");
}
