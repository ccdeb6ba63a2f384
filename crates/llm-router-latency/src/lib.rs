//! Per-provider EMA latency tracker.
//!
//! Maintains an in-process exponential moving average of observed
//! latencies. Intentionally not shared across instances: a little
//! latency-ranking inconsistency across a fleet is an acceptable trade for
//! not writing to shared storage on every completed request.

use std::collections::HashMap;

use tokio::sync::Mutex;

pub const DEFAULT_ALPHA: f64 = 0.2;
pub const INITIAL_LATENCY_MS: f64 = 500.0;

pub struct LatencyTracker {
    alpha: f64,
    ema: Mutex<HashMap<String, f64>>,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl LatencyTracker {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            ema: Mutex::new(HashMap::new()),
        }
    }

    /// Update the EMA for `provider` with a new latency observation.
    pub async fn update(&self, provider: &str, latency_ms: f64) {
        let mut ema = self.ema.lock().await;
        let current = *ema.get(provider).unwrap_or(&INITIAL_LATENCY_MS);
        ema.insert(
            provider.to_string(),
            self.alpha * latency_ms + (1.0 - self.alpha) * current,
        );
    }

    /// Return the current EMA for `provider`, or the seeded default if no
    /// observation has been recorded yet.
    pub async fn get(&self, provider: &str) -> f64 {
        let ema = self.ema.lock().await;
        *ema.get(provider).unwrap_or(&INITIAL_LATENCY_MS)
    }
}
