//! Metrics regression test: tripping a provider's circuit breaker through
//! the public router API must still emit the `llm_router_circuit_open_total`
//! counter with a `provider` label, the way the breaker crate's own
//! `record_failure` documents. Metric names and labels are part of this
//! crate's observability contract, so a rename here should be deliberate.

mod common;

mod helpers {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use std::sync::LazyLock;

    pub(crate) static RECORDER: LazyLock<DebuggingRecorder> = LazyLock::new(DebuggingRecorder::default);

    pub(crate) fn init_recorder() {
        let _ = metrics::set_global_recorder(&*RECORDER);
    }

    pub(crate) fn assert_counter_with_label(name: &str, label_key: &str, label_value: &str) {
        let snapshot = RECORDER.snapshotter().snapshot().into_vec();
        let found = snapshot.iter().any(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            key.name() == name
                && matches!(value, DebugValue::Counter(_))
                && key
                    .labels()
                    .any(|label| label.key() == label_key && label.value() == label_value)
        });
        assert!(
            found,
            "expected counter '{name}' with label {label_key}='{label_value}' not found"
        );
    }
}

use llm_router::{CircuitBreakerSettings, RouterConfig};
use llm_router_core::{ChatMessage, Request};

use common::{spec, MockAdapter};

#[tokio::test]
async fn tripped_breaker_emits_circuit_open_counter() {
    helpers::init_recorder();

    let a = MockAdapter::always_fails(spec("a", 100, 50_000), "down");
    let b = MockAdapter::always_succeeds(spec("b", 100, 50_000), "hi from b");

    let config = RouterConfig::builder()
        .provider(a)
        .provider(b)
        .circuit_breaker(CircuitBreakerSettings {
            failure_threshold: 1,
            cooldown_seconds: 30,
        })
        .build();
    let router = llm_router::LLMRouter::new(config);

    router
        .chat(Request::builder(vec![ChatMessage::user("hi")]).build().unwrap())
        .await
        .unwrap();

    helpers::assert_counter_with_label("llm_router_circuit_open_total", "provider", "a");
}
