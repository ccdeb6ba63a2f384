//! `ProviderAdapter`: the contract every provider adapter implements,
//! and `ProviderRegistry`, the thread-safe container that holds them.
//!
//! An adapter wraps a pre-configured vendor SDK client and exposes a
//! uniform interface to the router. The router never talks to a vendor
//! SDK directly; it always goes through an adapter, so provider-specific
//! error handling (429s, connection errors, vendor status codes) stays
//! contained inside each adapter. Concrete vendor adapters (OpenAI,
//! Anthropic, ...) are not part of this crate; only the contract is.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use llm_router_core::error::AdapterError;
use tokio::sync::Mutex;

/// Static metadata describing a provider: its limits, model string, and
/// static preference weight. Adapters expose this via [`ProviderAdapter`]
/// accessors so the router/scorer never need a second lookup table.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
    pub rpm_limit: u32,
    pub tpm_limit: u32,
    pub weight: f64,
    pub enabled: bool,
}

/// Error returned when a [`ProviderSpec`] is constructed with an
/// out-of-range field.
#[derive(Debug, thiserror::Error)]
pub enum ProviderSpecError {
    #[error("rpm_limit must be > 0")]
    InvalidRpmLimit,
    #[error("tpm_limit must be > 0")]
    InvalidTpmLimit,
}

impl ProviderSpec {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        rpm_limit: u32,
        tpm_limit: u32,
    ) -> Result<Self, ProviderSpecError> {
        if rpm_limit == 0 {
            return Err(ProviderSpecError::InvalidRpmLimit);
        }
        if tpm_limit == 0 {
            return Err(ProviderSpecError::InvalidTpmLimit);
        }
        Ok(Self {
            name: name.into(),
            model: model.into(),
            rpm_limit,
            tpm_limit,
            weight: 1.0,
            enabled: true,
        })
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A single streamed text chunk, or a terminal adapter error.
pub type ChatChunk = Result<String, AdapterError>;

/// Abstract contract every LLM provider adapter implements.
///
/// Adding a new provider requires only implementing this trait; the
/// router, scorer, breaker and predictor never depend on a concrete
/// vendor type.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn spec(&self) -> &ProviderSpec;

    /// Send a non-streaming chat request.
    ///
    /// Any error from the underlying SDK should be returned as-is (boxed);
    /// the router handles every adapter error uniformly: it records a
    /// breaker failure and tries the next candidate.
    async fn chat(
        &self,
        messages: &[llm_router_core::ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<llm_router_core::ChatOutcome, AdapterError>;

    /// Send a streaming chat request, yielding text chunks as they arrive.
    /// The same error semantics as [`chat`](ProviderAdapter::chat) apply.
    async fn stream(
        &self,
        messages: &[llm_router_core::ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<BoxStream<'static, ChatChunk>, AdapterError>;

    /// Release any resources held by this adapter (HTTP clients, etc.).
    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Thread-safe container for all registered provider adapters.
///
/// The registry is the single source of truth for which providers are
/// available; the router queries it on every routing decision. There is
/// exactly one registration path, [`ProviderRegistry::register`], which
/// always takes a fully-built adapter. This is a deliberate departure from
/// letting the registry construct an adapter on the caller's behalf for
/// BYOC: a registry-side constructor has no reliable way to hand a
/// pre-built client into an adapter it is creating itself, so the caller
/// builds the adapter (with its client already wired in) and the registry
/// only ever stores it.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Mutex<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fully-built provider adapter.
    pub async fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let name = adapter.spec().name.clone();
        let mut providers = self.providers.lock().await;
        providers.insert(name, adapter);
    }

    /// Return all enabled providers. Snapshotted under the lock and
    /// cloned out so the lock is released before any I/O runs against them.
    pub async fn get_all(&self) -> Vec<Arc<dyn ProviderAdapter>> {
        let providers = self.providers.lock().await;
        providers
            .values()
            .filter(|p| p.spec().enabled)
            .cloned()
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        let providers = self.providers.lock().await;
        providers.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let providers = self.providers.lock().await;
        providers.keys().cloned().collect()
    }

    /// Call `close` on every registered provider.
    pub async fn close_all(&self) {
        let providers = self.providers.lock().await;
        for provider in providers.values() {
            let _ = provider.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_router_core::{ChatMessage, ChatOutcome};

    struct EchoAdapter {
        spec: ProviderSpec,
    }

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn spec(&self) -> &ProviderSpec {
            &self.spec
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<ChatOutcome, AdapterError> {
            Ok(ChatOutcome {
                content: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                input_tokens: 10,
                output_tokens: 5,
            })
        }

        async fn stream(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<BoxStream<'static, ChatChunk>, AdapterError> {
            use futures::stream;
            Ok(Box::pin(stream::iter(vec![Ok("hi".to_string())])))
        }
    }

    #[tokio::test]
    async fn register_and_fetch() {
        let registry = ProviderRegistry::new();
        let spec = ProviderSpec::new("openai", "gpt-4o", 500, 200_000).unwrap();
        registry.register(Arc::new(EchoAdapter { spec })).await;
        assert_eq!(registry.names().await, vec!["openai".to_string()]);
        assert!(registry.get("openai").await.is_some());
    }

    #[tokio::test]
    async fn disabled_providers_excluded_from_get_all() {
        let registry = ProviderRegistry::new();
        let spec = ProviderSpec::new("openai", "gpt-4o", 500, 200_000)
            .unwrap()
            .enabled(false);
        registry.register(Arc::new(EchoAdapter { spec })).await;
        assert!(registry.get_all().await.is_empty());
        assert!(registry.get("openai").await.is_some());
    }
}
