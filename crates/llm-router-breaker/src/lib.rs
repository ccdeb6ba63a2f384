//! Per-provider circuit breaker.
//!
//! State machine
//! -------------
//! CLOSED   → normal operation. Consecutive failures increment a counter.
//! OPEN     → provider is blocked until `cooldown` elapses.
//! HALF-OPEN is implicit: once the cooldown elapses the provider is
//! re-admitted, and if the next request succeeds the failure counter
//! resets (CLOSED). If it fails, the circuit trips again immediately.
//!
//! Multi-instance support: enable the `redis-backend` feature and call
//! [`CircuitBreaker::with_shared_marker`] to back the OPEN state with a
//! Redis key that carries its own TTL, so no background job is needed to
//! re-admit a provider, and every instance observes the same state.
//! Without it, state is per-process, which is fine for single-instance
//! deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub use llm_router_core::error::CircuitOpenError;

#[derive(Debug, Clone, Default)]
struct LocalState {
    failures: u32,
    open_until: Option<Instant>,
}

/// Point-in-time view of a provider's breaker state.
#[derive(Debug, Clone)]
pub struct CircuitStatus {
    pub circuit_open: bool,
    pub failure_count: u32,
}

/// Thread/task-safe circuit breaker, keyed by provider name.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Mutex<HashMap<String, LocalState>>,
    #[cfg(feature = "redis-backend")]
    shared_marker: Option<Mutex<redis::aio::MultiplexedConnection>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown_seconds: u64) -> Self {
        Self {
            threshold: failure_threshold,
            cooldown: Duration::from_secs(cooldown_seconds),
            state: Mutex::new(HashMap::new()),
            #[cfg(feature = "redis-backend")]
            shared_marker: None,
        }
    }

    #[cfg(feature = "redis-backend")]
    pub fn with_shared_marker(mut self, conn: redis::aio::MultiplexedConnection) -> Self {
        self.shared_marker = Some(Mutex::new(conn));
        self
    }

    #[cfg(feature = "redis-backend")]
    async fn redis_is_open(&self, provider: &str) -> bool {
        use redis::AsyncCommands;
        let Some(marker) = &self.shared_marker else {
            return false;
        };
        let key = format!("llm_router:circuit:{provider}");
        let mut conn = marker.lock().await;
        conn.exists::<_, bool>(key).await.unwrap_or(false)
    }

    #[cfg(feature = "redis-backend")]
    async fn redis_set_open(&self, provider: &str) {
        use redis::AsyncCommands;
        let Some(marker) = &self.shared_marker else {
            return;
        };
        let key = format!("llm_router:circuit:{provider}");
        let mut conn = marker.lock().await;
        let _: redis::RedisResult<()> = conn.set_ex(key, "1", self.cooldown.as_secs()).await;
    }

    #[cfg(not(feature = "redis-backend"))]
    async fn redis_is_open(&self, _provider: &str) -> bool {
        false
    }

    #[cfg(not(feature = "redis-backend"))]
    async fn redis_set_open(&self, _provider: &str) {}

    /// Return true if the circuit for `provider` is currently OPEN.
    pub async fn is_open(&self, provider: &str) -> bool {
        if self.redis_is_open(provider).await {
            return true;
        }

        let mut state = self.state.lock().await;
        let entry = state.entry(provider.to_string()).or_default();
        match entry.open_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                // Cooldown elapsed, reset.
                entry.open_until = None;
                entry.failures = 0;
                false
            }
            None => false,
        }
    }

    /// Return `Err` if the circuit for `provider` is OPEN; call before
    /// attempting a provider request.
    pub async fn guard(&self, provider: &str) -> Result<(), CircuitOpenError> {
        if self.is_open(provider).await {
            Err(CircuitOpenError(provider.to_string()))
        } else {
            Ok(())
        }
    }

    /// Record a successful request; resets the failure counter (CLOSED).
    pub async fn record_success(&self, provider: &str) {
        let mut state = self.state.lock().await;
        let entry = state.entry(provider.to_string()).or_default();
        entry.failures = 0;
        entry.open_until = None;
        #[cfg(feature = "tracing")]
        tracing::debug!(provider, "circuit breaker: success recorded");
    }

    /// Record a failed request. Trips the circuit if consecutive failures
    /// reach the configured threshold.
    pub async fn record_failure(&self, provider: &str) {
        let tripped = {
            let mut state = self.state.lock().await;
            let entry = state.entry(provider.to_string()).or_default();
            entry.failures += 1;
            if entry.failures >= self.threshold {
                entry.open_until = Some(Instant::now() + self.cooldown);
                true
            } else {
                false
            }
        };
        if tripped {
            self.redis_set_open(provider).await;
            #[cfg(feature = "tracing")]
            tracing::warn!(provider, "circuit breaker tripped OPEN");
            #[cfg(feature = "metrics")]
            metrics::counter!("llm_router_circuit_open_total", "provider" => provider.to_string())
                .increment(1);
        }
    }

    pub async fn get_status(&self, provider: &str) -> CircuitStatus {
        let circuit_open = self.is_open(provider).await;
        let state = self.state.lock().await;
        let failure_count = state.get(provider).map(|s| s.failures).unwrap_or(0);
        CircuitStatus {
            circuit_open,
            failure_count,
        }
    }
}
