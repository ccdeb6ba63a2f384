//! `LLMRouter`: the primary type callers interact with.
//!
//! Orchestrates the full routing pipeline:
//! 1. Estimate tokens for the request.
//! 2. Resolve session affinity (sticky routing) / force-provider pin.
//! 3. Score and rank all available providers.
//! 4. Iterate the ranked list, calling each provider until one succeeds.
//! 5. Record usage, update the latency EMA, fire the `on_route` hook.
//! 6. Return a [`Response`] to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::Stream;
use tokio::sync::{Mutex, RwLock};

use llm_router_breaker::CircuitBreaker;
use llm_router_core::{
    ChatMessage, OnRouteHook, Priority, Request, Response, RouteEvent, RouterError,
};
use llm_router_estimator::{DefaultTokenEstimator, TokenEstimator};
use llm_router_latency::LatencyTracker;
use llm_router_predictor::ExhaustionPredictor;
use llm_router_registry::{ProviderAdapter, ProviderRegistry};
use llm_router_scorer::{ScoreInput, Scorer};
use llm_router_state::{InMemoryStateBackend, StateBackend};

use crate::config::RouterConfig;

/// Adaptive, rate-limit-aware LLM router.
///
/// Construct with [`RouterConfig`], register providers either declaratively
/// via the config or at runtime via [`LLMRouter::register`], then call
/// [`LLMRouter::chat`] or [`LLMRouter::stream`].
pub struct LLMRouter {
    registry: ProviderRegistry,
    scorer: Scorer,
    latency: LatencyTracker,
    predictor: ExhaustionPredictor,
    breaker: CircuitBreaker,
    estimator: Box<dyn TokenEstimator>,
    state: RwLock<Arc<dyn StateBackend>>,
    redis_url: Option<String>,
    window_seconds: u64,
    high_priority_reserve_pct: f64,
    normal_weights: (f64, f64, f64),
    on_route: Option<OnRouteHook>,
    initial_providers: Mutex<Vec<Arc<dyn ProviderAdapter>>>,
    initialized: Mutex<bool>,
}

impl LLMRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            registry: ProviderRegistry::new(),
            scorer: Scorer::default(),
            latency: LatencyTracker::default(),
            predictor: ExhaustionPredictor::with_defaults(config.window_seconds),
            breaker: CircuitBreaker::new(
                config.circuit_breaker.failure_threshold,
                config.circuit_breaker.cooldown_seconds,
            ),
            estimator: Box::new(DefaultTokenEstimator),
            state: RwLock::new(Arc::new(InMemoryStateBackend::new())),
            redis_url: config.redis_url,
            window_seconds: config.window_seconds,
            high_priority_reserve_pct: config.high_priority_reserve_pct,
            normal_weights: (
                config.weights.capacity,
                config.weights.latency,
                config.weights.static_,
            ),
            on_route: config.on_route,
            initial_providers: Mutex::new(config.providers),
            initialized: Mutex::new(false),
        }
    }

    /// Register a pre-configured provider adapter at runtime (BYOC). Takes
    /// effect on the very next routing decision: there's no pending-
    /// registration queue, since the registry's insert is already async and
    /// there is nothing to defer.
    pub async fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        self.registry.register(adapter).await;
    }

    async fn ensure_initialized(&self) -> Result<(), RouterError> {
        {
            let initialized = self.initialized.lock().await;
            if *initialized {
                return Ok(());
            }
        }
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        if let Some(url) = &self.redis_url {
            self.connect_shared_state(url).await?;
        }

        let mut pending = self.initial_providers.lock().await;
        for adapter in pending.drain(..) {
            self.registry.register(adapter).await;
        }

        *initialized = true;
        Ok(())
    }

    #[cfg(feature = "redis-backend")]
    async fn connect_shared_state(&self, url: &str) -> Result<(), RouterError> {
        let backend = llm_router_state::RedisStateBackend::connect(url)
            .await
            .map_err(|e| RouterError::StateBackendUnavailable(e.to_string()))?;
        let mut state = self.state.write().await;
        *state = Arc::new(backend);
        Ok(())
    }

    #[cfg(not(feature = "redis-backend"))]
    async fn connect_shared_state(&self, url: &str) -> Result<(), RouterError> {
        Err(RouterError::StateBackendUnavailable(format!(
            "redis_url '{url}' was set but the redis-backend feature is not enabled"
        )))
    }

    async fn state(&self) -> Arc<dyn StateBackend> {
        self.state.read().await.clone()
    }

    fn estimate_tokens(&self, messages: &[ChatMessage]) -> u32 {
        self.estimator.estimate(messages)
    }

    async fn get_ranked_providers(
        &self,
        estimated_tokens: u32,
        priority: Priority,
        force_provider: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Vec<Arc<dyn ProviderAdapter>>, RouterError> {
        let all_providers = self.registry.get_all().await;
        if all_providers.is_empty() {
            return Err(RouterError::NoProvidersConfigured);
        }

        let state = self.state().await;

        let mut pinned_name: Option<String> = None;
        if let Some(sid) = session_id {
            pinned_name = state.get_session_provider(sid).await;
        }
        if let Some(fp) = force_provider {
            pinned_name = Some(fp.to_string());
        }

        let mut scored = Vec::new();
        let mut unscored_fallback = Vec::new();

        for provider in &all_providers {
            let name = provider.spec().name.clone();
            if self.breaker.is_open(&name).await {
                continue;
            }

            let (rpm_used, tpm_used) = state.get_usage(&name, self.window_seconds).await;
            let is_at_risk = self
                .predictor
                .is_at_risk(
                    &name,
                    rpm_used,
                    provider.spec().rpm_limit,
                    tpm_used,
                    provider.spec().tpm_limit,
                )
                .await;

            let score = self.scorer.score_provider(ScoreInput {
                name: &name,
                rpm_used,
                rpm_limit: provider.spec().rpm_limit,
                tpm_used,
                tpm_limit: provider.spec().tpm_limit,
                estimated_tokens,
                latency_ema_ms: self.latency.get(&name).await,
                static_weight: provider.spec().weight,
                priority,
                is_at_risk,
                high_priority_reserve_pct: self.high_priority_reserve_pct,
                normal_weights: self.normal_weights,
            });

            match score {
                Some(ps) => scored.push(ps),
                None => unscored_fallback.push(provider.clone()),
            }
        }

        let ranked_scores = self.scorer.rank(scored);
        let provider_map: HashMap<String, Arc<dyn ProviderAdapter>> = all_providers
            .iter()
            .map(|p| (p.spec().name.clone(), p.clone()))
            .collect();

        let mut ranked: Vec<Arc<dyn ProviderAdapter>> = ranked_scores
            .iter()
            .filter_map(|ps| provider_map.get(&ps.name).cloned())
            .collect();

        if let Some(pinned) = &pinned_name {
            if let Some(p) = provider_map.get(pinned) {
                ranked.retain(|x| &x.spec().name != pinned);
                if !self.breaker.is_open(pinned).await {
                    ranked.insert(0, p.clone());
                }
            }
        }

        for p in unscored_fallback {
            if !ranked.iter().any(|x| Arc::ptr_eq(x, &p)) {
                ranked.push(p);
            }
        }

        Ok(ranked)
    }

    /// Route a chat completion request to the best available provider.
    /// Tries providers in ranked order until one succeeds; if all fail,
    /// returns [`RouterError::AllProvidersFailed`].
    pub async fn chat(&self, request: Request) -> Result<Response, RouterError> {
        self.ensure_initialized().await?;

        let estimated_tokens = self.estimate_tokens(&request.messages);

        let all_providers = self.registry.get_all().await;
        if !all_providers.is_empty()
            && all_providers
                .iter()
                .all(|p| estimated_tokens > p.spec().tpm_limit)
        {
            return Err(RouterError::TokenLimitExceeded);
        }

        let ranked = self
            .get_ranked_providers(
                estimated_tokens,
                request.priority,
                request.force_provider.as_deref(),
                request.session_id.as_deref(),
            )
            .await?;

        if ranked.is_empty() {
            return Err(RouterError::NoProvidersConfigured);
        }

        let state = self.state().await;
        let mut errors: Vec<(String, llm_router_core::AdapterError)> = Vec::new();

        for (index, provider) in ranked.iter().enumerate() {
            let attempt_number = (index + 1) as u32;
            let name = provider.spec().name.clone();

            if self.breaker.guard(&name).await.is_err() {
                continue;
            }

            let t0 = Instant::now();
            let chat_result = {
                #[cfg(feature = "tracing")]
                let attempt_span =
                    tracing::debug_span!("router_attempt", provider = %name, attempt = attempt_number);
                #[cfg(feature = "tracing")]
                let _enter = attempt_span.enter();

                provider
                    .chat(&request.messages, request.max_tokens, request.temperature)
                    .await
            };
            let outcome = match chat_result {
                Ok(outcome) => outcome,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(provider = %name, attempt = attempt_number, error = %err, "chat attempt failed");
                    #[cfg(feature = "metrics")]
                    metrics::counter!(
                        "llm_router_attempts_total",
                        "provider" => name.clone(),
                        "outcome" => "failure"
                    )
                    .increment(1);

                    errors.push((name.clone(), err));
                    self.breaker.record_failure(&name).await;
                    continue;
                }
            };
            let latency_ms = t0.elapsed().as_secs_f64() * 1000.0;

            #[cfg(feature = "tracing")]
            tracing::debug!(provider = %name, attempt = attempt_number, latency_ms, "chat attempt succeeded");
            #[cfg(feature = "metrics")]
            {
                metrics::counter!(
                    "llm_router_attempts_total",
                    "provider" => name.clone(),
                    "outcome" => "success"
                )
                .increment(1);
                metrics::histogram!("llm_router_route_latency_ms", "provider" => name.clone())
                    .record(latency_ms);
            }

            let total_tokens = (outcome.input_tokens + outcome.output_tokens) as u64;
            state
                .record_request(&name, total_tokens, self.window_seconds)
                .await;
            self.latency.update(&name, latency_ms).await;
            self.predictor.record(&name, total_tokens).await;
            self.breaker.record_success(&name).await;

            if let Some(sid) = &request.session_id {
                state.set_session_provider(sid, &name, 3600).await;
            }

            let (rpm_used, tpm_used) = state.get_usage(&name, self.window_seconds).await;
            let headroom_pct = headroom_pct(
                rpm_used,
                provider.spec().rpm_limit,
                tpm_used,
                provider.spec().tpm_limit,
            );

            if let Some(hook) = &self.on_route {
                hook.fire(RouteEvent {
                    provider: name.clone(),
                    model: provider.spec().model.clone(),
                    input_tokens: outcome.input_tokens,
                    output_tokens: outcome.output_tokens,
                    latency_ms,
                    headroom_pct,
                    circuit_open: false,
                    attempt_number,
                    session_id: request.session_id.clone(),
                    priority: request.priority,
                })
                .await;
            }

            return Ok(Response {
                content: outcome.content,
                provider: name,
                model: provider.spec().model.clone(),
                input_tokens: outcome.input_tokens,
                output_tokens: outcome.output_tokens,
                latency_ms,
                attempts: attempt_number,
            });
        }

        Err(RouterError::AllProvidersFailed {
            attempts: errors.len() as u32,
            errors,
        })
    }

    /// Route a streaming chat completion request, yielding text chunks as
    /// they arrive. Fallback to the next provider applies only until the
    /// first chunk is yielded; once streaming has started for a provider,
    /// a failure surfaces directly rather than retrying.
    ///
    /// Requires an `Arc<LLMRouter>` since the returned stream outlives the
    /// call that created it.
    pub fn stream(
        self: Arc<Self>,
        request: Request,
    ) -> impl Stream<Item = Result<String, RouterError>> + Send + 'static {
        async_stream::try_stream! {
            self.ensure_initialized().await?;

            let estimated_tokens = self.estimate_tokens(&request.messages);
            let ranked = self
                .get_ranked_providers(
                    estimated_tokens,
                    request.priority,
                    request.force_provider.as_deref(),
                    request.session_id.as_deref(),
                )
                .await?;

            if ranked.is_empty() {
                Err(RouterError::NoProvidersConfigured)?;
            }

            let state = self.state().await;
            let mut errors: Vec<(String, llm_router_core::AdapterError)> = Vec::new();
            let mut succeeded = false;

            for (index, provider) in ranked.iter().enumerate() {
                let _attempt_number = (index + 1) as u32;
                let name = provider.spec().name.clone();
                if self.breaker.guard(&name).await.is_err() {
                    continue;
                }

                let t0 = Instant::now();
                let stream_result = {
                    #[cfg(feature = "tracing")]
                    let attempt_span = tracing::debug_span!(
                        "router_attempt",
                        provider = %name,
                        attempt = _attempt_number
                    );
                    #[cfg(feature = "tracing")]
                    let _enter = attempt_span.enter();

                    provider
                        .stream(&request.messages, request.max_tokens, request.temperature)
                        .await
                };
                let mut chunk_stream = match stream_result {
                    Ok(s) => s,
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(provider = %name, attempt = _attempt_number, error = %err, "stream attempt failed to open");
                        #[cfg(feature = "metrics")]
                        metrics::counter!(
                            "llm_router_attempts_total",
                            "provider" => name.clone(),
                            "outcome" => "failure"
                        )
                        .increment(1);

                        errors.push((name.clone(), err));
                        self.breaker.record_failure(&name).await;
                        continue;
                    }
                };

                let mut started = false;
                let mut failed_before_start = false;
                {
                    use futures::StreamExt;
                    while let Some(item) = chunk_stream.next().await {
                        match item {
                            Ok(chunk) => {
                                started = true;
                                yield chunk;
                            }
                            Err(err) if !started => {
                                #[cfg(feature = "tracing")]
                                tracing::warn!(provider = %name, attempt = _attempt_number, error = %err, "stream attempt failed before first chunk");
                                #[cfg(feature = "metrics")]
                                metrics::counter!(
                                    "llm_router_attempts_total",
                                    "provider" => name.clone(),
                                    "outcome" => "failure"
                                )
                                .increment(1);

                                failed_before_start = true;
                                errors.push((name.clone(), err));
                                self.breaker.record_failure(&name).await;
                                break;
                            }
                            Err(err) => {
                                // Fallback is no longer legal once a chunk has
                                // been yielded: surface directly, no retry.
                                #[cfg(feature = "tracing")]
                                tracing::warn!(provider = %name, attempt = _attempt_number, error = %err, "stream attempt failed after first chunk");
                                #[cfg(feature = "metrics")]
                                metrics::counter!(
                                    "llm_router_attempts_total",
                                    "provider" => name.clone(),
                                    "outcome" => "failure"
                                )
                                .increment(1);

                                self.breaker.record_failure(&name).await;
                                Err(RouterError::StreamFailedAfterStart {
                                    provider: name.clone(),
                                    source: err,
                                })?;
                            }
                        }
                    }
                }

                if failed_before_start {
                    continue;
                }

                let latency_ms = t0.elapsed().as_secs_f64() * 1000.0;

                #[cfg(feature = "tracing")]
                tracing::debug!(provider = %name, attempt = _attempt_number, latency_ms, "stream attempt succeeded");
                #[cfg(feature = "metrics")]
                {
                    metrics::counter!(
                        "llm_router_attempts_total",
                        "provider" => name.clone(),
                        "outcome" => "success"
                    )
                    .increment(1);
                    metrics::histogram!("llm_router_route_latency_ms", "provider" => name.clone())
                        .record(latency_ms);
                }

                state
                    .record_request(&name, estimated_tokens as u64, self.window_seconds)
                    .await;
                self.latency.update(&name, latency_ms).await;
                self.predictor.record(&name, estimated_tokens as u64).await;
                self.breaker.record_success(&name).await;
                if let Some(sid) = &request.session_id {
                    state.set_session_provider(sid, &name, 3600).await;
                }
                succeeded = true;
                break;
            }

            if !succeeded {
                Err(RouterError::AllProvidersFailed {
                    attempts: errors.len() as u32,
                    errors,
                })?;
            }
        }
    }

    /// Return the current state of every registered provider: usage,
    /// headroom, circuit state and average latency.
    pub async fn status(&self) -> Result<HashMap<String, llm_router_core::ProviderStatus>, RouterError> {
        self.ensure_initialized().await?;

        let state = self.state().await;
        let providers = self.registry.get_all().await;
        let mut result = HashMap::new();

        for provider in providers {
            let name = provider.spec().name.clone();
            let (rpm_used, tpm_used) = state.get_usage(&name, self.window_seconds).await;
            let circuit_open = self.breaker.is_open(&name).await;
            let avg_latency_ms = self.latency.get(&name).await;

            result.insert(
                name,
                llm_router_core::ProviderStatus {
                    rpm_used,
                    rpm_limit: provider.spec().rpm_limit,
                    tpm_used,
                    tpm_limit: provider.spec().tpm_limit,
                    headroom_pct: headroom_pct(
                        rpm_used,
                        provider.spec().rpm_limit,
                        tpm_used,
                        provider.spec().tpm_limit,
                    ),
                    circuit_open,
                    avg_latency_ms,
                },
            );
        }

        Ok(result)
    }

    /// Release all resources held by registered providers and the state
    /// backend (HTTP clients, Redis connections, etc.).
    pub async fn close(&self) {
        self.registry.close_all().await;
        self.state().await.close().await;
    }
}

fn headroom_pct(rpm_used: u64, rpm_limit: u32, tpm_used: u64, tpm_limit: u32) -> f64 {
    let rpm_headroom = if rpm_limit > 0 {
        (1.0 - rpm_used as f64 / rpm_limit as f64) * 100.0
    } else {
        0.0
    };
    let tpm_headroom = if tpm_limit > 0 {
        (1.0 - tpm_used as f64 / tpm_limit as f64) * 100.0
    } else {
        0.0
    };
    rpm_headroom.min(tpm_headroom).max(0.0)
}
