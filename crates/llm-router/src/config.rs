//! Router configuration.
//!
//! Construct via [`RouterConfig::builder`] the way the rest of the
//! workspace builds its config types: a `FooConfigBuilder` with fluent
//! `.method(value) -> Self` setters, each documented with its default.

use std::sync::Arc;

use llm_router_core::OnRouteHook;
use llm_router_registry::ProviderAdapter;

/// Scoring weight coefficients for the normal-priority tier. High and low
/// priority weights are fixed constants inside `llm-router-scorer`; only
/// the default tier is developer-tunable, matching the original's
/// `RoutingWeights` model.
#[derive(Debug, Clone, Copy)]
pub struct RoutingWeights {
    pub capacity: f64,
    pub latency: f64,
    pub static_: f64,
}

impl Default for RoutingWeights {
    fn default() -> Self {
        Self {
            capacity: 0.5,
            latency: 0.3,
            static_: 0.2,
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures required to trip the circuit.
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before the provider is re-admitted.
    pub cooldown_seconds: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 30,
        }
    }
}

/// Top-level router configuration.
pub struct RouterConfig {
    pub(crate) providers: Vec<Arc<dyn ProviderAdapter>>,
    pub(crate) weights: RoutingWeights,
    pub(crate) circuit_breaker: CircuitBreakerSettings,
    pub(crate) redis_url: Option<String>,
    pub(crate) window_seconds: u64,
    pub(crate) high_priority_reserve_pct: f64,
    pub(crate) on_route: Option<OnRouteHook>,
}

impl RouterConfig {
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::new()
    }
}

pub struct RouterConfigBuilder {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    weights: RoutingWeights,
    circuit_breaker: CircuitBreakerSettings,
    redis_url: Option<String>,
    window_seconds: u64,
    high_priority_reserve_pct: f64,
    on_route: Option<OnRouteHook>,
}

impl RouterConfigBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            weights: RoutingWeights::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            redis_url: None,
            window_seconds: 60,
            high_priority_reserve_pct: 0.2,
            on_route: None,
        }
    }

    /// Register a provider adapter to be available from the first call.
    /// Can be called multiple times.
    pub fn provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(adapter);
        self
    }

    /// Scoring weight coefficients for normal-priority requests. Default:
    /// capacity 0.5, latency 0.3, static 0.2.
    pub fn weights(mut self, weights: RoutingWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Circuit breaker tuning. Default: 5 consecutive failures, 30s cooldown.
    pub fn circuit_breaker(mut self, settings: CircuitBreakerSettings) -> Self {
        self.circuit_breaker = settings;
        self
    }

    /// Redis connection URL. When set, usage accounting and circuit state
    /// are backed by Redis for multi-instance deployments. Requires the
    /// `redis-backend` feature. Default: unset (in-process state).
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Rolling usage-window duration in seconds. Default: 60.
    pub fn window_seconds(mut self, seconds: u64) -> Self {
        self.window_seconds = seconds;
        self
    }

    /// Fraction of capacity reserved exclusively for high-priority
    /// requests. Default: 0.2.
    pub fn high_priority_reserve_pct(mut self, pct: f64) -> Self {
        self.high_priority_reserve_pct = pct;
        self
    }

    /// Optional async callback fired after every successful routing
    /// decision. Default: none.
    pub fn on_route(mut self, hook: OnRouteHook) -> Self {
        self.on_route = Some(hook);
        self
    }

    pub fn build(self) -> RouterConfig {
        RouterConfig {
            providers: self.providers,
            weights: self.weights,
            circuit_breaker: self.circuit_breaker,
            redis_url: self.redis_url,
            window_seconds: self.window_seconds,
            high_priority_reserve_pct: self.high_priority_reserve_pct,
            on_route: self.on_route,
        }
    }
}

impl Default for RouterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
