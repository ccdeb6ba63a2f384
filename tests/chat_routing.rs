//! End-to-end routing: provider selection, fallback on failure, and the
//! two caller-visible errors that can be raised before any adapter is
//! attempted.

mod common;

use std::sync::Arc;

use llm_router::RouterConfig;
use llm_router_core::{ChatMessage, Priority, Request, RouterError};

use common::{spec, MockAdapter};

/// S1: two healthy upstreams, higher-weight one wins with a single attempt.
#[tokio::test]
async fn simple_success_picks_best_scoring_provider() {
    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000).weight(1.0), "hi from a");
    let b = MockAdapter::always_succeeds(spec("b", 50, 50_000).weight(0.8), "hi from b");

    let config = RouterConfig::builder()
        .provider(a.clone())
        .provider(b.clone())
        .build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")])
        .priority(Priority::Normal)
        .build()
        .unwrap();

    let response = router.chat(request).await.unwrap();
    assert_eq!(response.provider, "a");
    assert_eq!(response.attempts, 1);
}

/// S2: the top-ranked provider fails, the router falls through to the
/// next candidate and records a breaker failure against the first.
#[tokio::test]
async fn fallback_on_failure_tries_next_provider() {
    let a = MockAdapter::always_fails(spec("a", 100, 50_000).weight(1.0), "upstream unavailable");
    let b = MockAdapter::always_succeeds(spec("b", 50, 50_000).weight(0.5), "hi from b");

    let config = RouterConfig::builder()
        .provider(a.clone())
        .provider(b.clone())
        .build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")])
        .build()
        .unwrap();

    let response = router.chat(request).await.unwrap();
    assert_eq!(response.provider, "b");
    assert_eq!(response.attempts, 2);
    assert_eq!(a.chat_call_count(), 1);
}

#[tokio::test]
async fn no_providers_configured_is_raised_with_empty_registry() {
    let config = RouterConfig::builder().build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")]).build().unwrap();
    let err = router.chat(request).await.unwrap_err();
    assert!(err.is_no_providers_configured());
}

#[tokio::test]
async fn all_providers_failed_carries_every_error() {
    let a = MockAdapter::always_fails(spec("a", 100, 50_000), "a down");
    let b = MockAdapter::always_fails(spec("b", 100, 50_000), "b down");

    let config = RouterConfig::builder().provider(a).provider(b).build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")]).build().unwrap();
    match router.chat(request).await.unwrap_err() {
        RouterError::AllProvidersFailed { attempts, errors } => {
            assert_eq!(attempts, 2);
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected AllProvidersFailed, got {other:?}"),
    }
}

/// A provider whose TPM cap is far below any realistic estimate should
/// cause `TokenLimitExceeded` before any adapter is ever called.
#[tokio::test]
async fn token_limit_exceeded_when_every_provider_tpm_is_too_small() {
    let a = MockAdapter::always_succeeds(spec("a", 100, 1), "unreachable");

    let config = RouterConfig::builder().provider(a.clone()).build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user(
        "this message is long enough to need more than one token of budget",
    )])
    .build()
    .unwrap();

    let err = router.chat(request).await.unwrap_err();
    assert!(err.is_token_limit_exceeded());
    assert_eq!(a.chat_call_count(), 0);
}

/// A disabled provider is invisible to routing even though it is still
/// registered.
#[tokio::test]
async fn disabled_provider_is_never_attempted() {
    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000).enabled(false), "unreachable");
    let b = MockAdapter::always_succeeds(spec("b", 100, 50_000), "hi from b");

    let config = RouterConfig::builder().provider(a.clone()).provider(b).build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")]).build().unwrap();
    let response = router.chat(request).await.unwrap();
    assert_eq!(response.provider, "b");
    assert_eq!(a.chat_call_count(), 0);
}

/// `force_provider` pins routing regardless of score, as long as that
/// provider is enabled and its circuit is closed.
#[tokio::test]
async fn force_provider_overrides_scoring() {
    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000).weight(1.0), "hi from a");
    let b = MockAdapter::always_succeeds(spec("b", 50, 50_000).weight(0.1), "hi from b");

    let config = RouterConfig::builder().provider(a).provider(b).build();
    let router = llm_router::LLMRouter::new(config);

    let request = Request::builder(vec![ChatMessage::user("hi")])
        .force_provider("b")
        .build()
        .unwrap();

    let response = router.chat(request).await.unwrap();
    assert_eq!(response.provider, "b");
    assert_eq!(response.attempts, 1);
}

/// `status()` reports usage, headroom and circuit state per provider
/// after at least one successful request.
#[tokio::test]
async fn status_reports_usage_after_requests() {
    let a = MockAdapter::always_succeeds(spec("a", 100, 50_000), "hi");
    let config = RouterConfig::builder().provider(Arc::clone(&a)).build();
    let router = llm_router::LLMRouter::new(config);

    router
        .chat(Request::builder(vec![ChatMessage::user("hi")]).build().unwrap())
        .await
        .unwrap();

    let status = router.status().await.unwrap();
    let a_status = &status["a"];
    assert_eq!(a_status.rpm_used, 1);
    assert_eq!(a_status.tpm_used, 15);
    assert!(!a_status.circuit_open);
}
