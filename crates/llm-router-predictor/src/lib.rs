//! Quota exhaustion prediction.
//!
//! Monitors the rate at which each provider's quota is being consumed. If a
//! provider is consuming quota at `multiplier`x the assumed-average rate
//! *and* is projected to exhaust quota within `look_ahead`, the predictor
//! signals that load should be shifted away before the hard limit is hit.
//! This avoids reactive 429s for predictable traffic spikes.
//!
//! Algorithm: record `(instant, tokens)` in a short history deque per
//! provider, compute the observed consumption rate over the remaining
//! entries, project seconds-to-exhaustion for both RPM and TPM, and flag
//! at-risk if the rate is elevated and the sooner of the two projections
//! is inside the look-ahead window.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
pub const DEFAULT_LOOK_AHEAD_SECONDS: f64 = 120.0;
pub const DEFAULT_MULTIPLIER: f64 = 3.0;
/// Assumed-average utilisation used as the elevated-rate reference, absent
/// any learned baseline. See the design notes on why this stays fixed.
const REFERENCE_UTILIZATION: f64 = 0.5;

struct History {
    entries: VecDeque<(Instant, u64)>,
}

pub struct ExhaustionPredictor {
    window: Duration,
    look_ahead: f64,
    multiplier: f64,
    history: Mutex<HashMap<String, History>>,
}

impl ExhaustionPredictor {
    pub fn new(window_seconds: u64, look_ahead_seconds: f64, multiplier: f64) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            look_ahead: look_ahead_seconds,
            multiplier,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults(window_seconds: u64) -> Self {
        Self::new(
            window_seconds,
            DEFAULT_LOOK_AHEAD_SECONDS,
            DEFAULT_MULTIPLIER,
        )
    }

    /// Record a completed request for `provider`.
    pub async fn record(&self, provider: &str, tokens: u64) {
        let now = Instant::now();
        let mut history = self.history.lock().await;
        let entry = history
            .entry(provider.to_string())
            .or_insert_with(|| History {
                entries: VecDeque::new(),
            });
        entry.entries.push_back((now, tokens));
        purge(&mut entry.entries, now, self.window);
    }

    /// Return true if `provider` is projected to exhaust quota within the
    /// look-ahead window under the current consumption rate.
    pub async fn is_at_risk(
        &self,
        provider: &str,
        rpm_used: u64,
        rpm_limit: u32,
        tpm_used: u64,
        tpm_limit: u32,
    ) -> bool {
        let now = Instant::now();
        let mut history = self.history.lock().await;
        let Some(entry) = history.get_mut(provider) else {
            return false;
        };
        purge(&mut entry.entries, now, self.window);
        if entry.entries.is_empty() {
            return false;
        }

        let oldest = entry.entries.front().unwrap().0;
        let elapsed = now.duration_since(oldest).as_secs_f64().max(1.0);
        let observed_rpm = entry.entries.len() as f64 / elapsed * 60.0;
        let observed_tpm =
            entry.entries.iter().map(|(_, t)| *t).sum::<u64>() as f64 / elapsed * 60.0;

        let avg_rpm = rpm_limit as f64 * REFERENCE_UTILIZATION;
        let avg_tpm = tpm_limit as f64 * REFERENCE_UTILIZATION;

        let rpm_elevated = observed_rpm > avg_rpm * self.multiplier;
        let tpm_elevated = observed_tpm > avg_tpm * self.multiplier;
        if !(rpm_elevated || tpm_elevated) {
            return false;
        }

        let rpm_remaining = rpm_limit as f64 - rpm_used as f64;
        let tpm_remaining = tpm_limit as f64 - tpm_used as f64;

        let seconds_to_rpm_exhaustion = if observed_rpm > 0.0 {
            (rpm_remaining / observed_rpm) * 60.0
        } else {
            f64::INFINITY
        };
        let seconds_to_tpm_exhaustion = if observed_tpm > 0.0 {
            (tpm_remaining / observed_tpm) * 60.0
        } else {
            f64::INFINITY
        };

        seconds_to_rpm_exhaustion.min(seconds_to_tpm_exhaustion) < self.look_ahead
    }
}

fn purge(entries: &mut VecDeque<(Instant, u64)>, now: Instant, window: Duration) {
    let cutoff = now.checked_sub(window).unwrap_or(now);
    while let Some((ts, _)) = entries.front() {
        if *ts < cutoff {
            entries.pop_front();
        } else {
            break;
        }
    }
}
