//! Provider scoring engine.
//!
//! Ranks available providers on every routing decision using a weighted
//! combination of:
//! - `capacity_score`: remaining RPM/TPM headroom (bottleneck of the two)
//! - `latency_score`: inverse of the EMA latency
//! - `static_score`: developer-configured preference weight
//!
//! ```text
//! score = capacity_score * w_capacity
//!       + latency_score  * w_latency
//!       + static_score   * w_static
//! ```
//!
//! Priority shifts the weights: `high` leans on capacity + latency (best
//! provider for user-facing traffic), `low` leans on the static weight
//! (cheapest/preferred provider for batch jobs).
//!
//! The scorer makes no I/O calls - all state is passed in as arguments so
//! it can be unit-tested in isolation.

use llm_router_core::Priority;

pub const LATENCY_CEILING_MS: f64 = 3_000.0;

const W_CAPACITY_HIGH: f64 = 0.5;
const W_LATENCY_HIGH: f64 = 0.4;
const W_STATIC_HIGH: f64 = 0.1;

const W_CAPACITY_NORMAL: f64 = 0.5;
const W_LATENCY_NORMAL: f64 = 0.3;
const W_STATIC_NORMAL: f64 = 0.2;

const W_CAPACITY_LOW: f64 = 0.3;
const W_LATENCY_LOW: f64 = 0.1;
const W_STATIC_LOW: f64 = 0.6;

/// Default normal-priority weights, exposed so callers can seed a
/// developer-facing config struct with the same defaults the scorer uses
/// when none is supplied.
pub const DEFAULT_NORMAL_WEIGHTS: (f64, f64, f64) =
    (W_CAPACITY_NORMAL, W_LATENCY_NORMAL, W_STATIC_NORMAL);

/// `normal_weights` overrides the normal-priority coefficients; high and
/// low priority weights are fixed constants (only the normal tier is
/// developer-tunable, matching the original's `RoutingWeights` model).
fn priority_weights(priority: Priority, normal_weights: (f64, f64, f64)) -> (f64, f64, f64) {
    match priority {
        Priority::High => (W_CAPACITY_HIGH, W_LATENCY_HIGH, W_STATIC_HIGH),
        Priority::Normal => normal_weights,
        Priority::Low => (W_CAPACITY_LOW, W_LATENCY_LOW, W_STATIC_LOW),
    }
}

/// Scoring result for a single provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderScore {
    pub name: String,
    pub score: f64,
    pub capacity_score: f64,
    pub latency_score: f64,
    pub static_score: f64,
    pub rpm_headroom: f64,
    pub tpm_headroom: f64,
    pub is_at_risk: bool,
}

/// Arguments to [`Scorer::score_provider`]; grouped in a struct since the
/// function takes more parameters than reads well positionally.
pub struct ScoreInput<'a> {
    pub name: &'a str,
    pub rpm_used: u64,
    pub rpm_limit: u32,
    pub tpm_used: u64,
    pub tpm_limit: u32,
    pub estimated_tokens: u32,
    pub latency_ema_ms: f64,
    pub static_weight: f64,
    pub priority: Priority,
    pub is_at_risk: bool,
    pub high_priority_reserve_pct: f64,
    /// Normal-priority weight override; pass [`DEFAULT_NORMAL_WEIGHTS`]
    /// unless the caller has configured custom weights.
    pub normal_weights: (f64, f64, f64),
}

#[derive(Default)]
pub struct Scorer;

impl Scorer {
    /// Score a single provider.
    ///
    /// Returns `None` if the provider has no capacity (headroom <= 0), is
    /// within the high-priority reserve for a non-high-priority request,
    /// or is flagged at-risk by the predictor for a non-high-priority
    /// request.
    pub fn score_provider(&self, input: ScoreInput<'_>) -> Option<ProviderScore> {
        let rpm_headroom = if input.rpm_limit > 0 {
            1.0 - (input.rpm_used as f64 / input.rpm_limit as f64)
        } else {
            0.0
        };
        let tpm_effective_used = input.tpm_used + input.estimated_tokens as u64;
        let tpm_headroom = if input.tpm_limit > 0 {
            1.0 - (tpm_effective_used as f64 / input.tpm_limit as f64)
        } else {
            0.0
        };

        let rpm_headroom = rpm_headroom.clamp(0.0, 1.0);
        let tpm_headroom = tpm_headroom.clamp(0.0, 1.0);

        if input.priority != Priority::High {
            let reserve = input.high_priority_reserve_pct;
            if rpm_headroom <= reserve || tpm_headroom <= reserve {
                return None;
            }
        }

        if rpm_headroom <= 0.0 || tpm_headroom <= 0.0 {
            return None;
        }

        if input.is_at_risk && input.priority != Priority::High {
            return None;
        }

        let capacity_score = rpm_headroom.min(tpm_headroom);
        let latency_score = (1.0 - input.latency_ema_ms / LATENCY_CEILING_MS).max(0.0);
        let static_score = input.static_weight.clamp(0.0, 1.0);

        let (w_cap, w_lat, w_sta) = priority_weights(input.priority, input.normal_weights);
        let score = capacity_score * w_cap + latency_score * w_lat + static_score * w_sta;

        Some(ProviderScore {
            name: input.name.to_string(),
            score,
            capacity_score,
            latency_score,
            static_score,
            rpm_headroom,
            tpm_headroom,
            is_at_risk: input.is_at_risk,
        })
    }

    /// Return providers sorted by score descending (stable: ties preserve
    /// input order).
    pub fn rank(&self, mut scores: Vec<ProviderScore>) -> Vec<ProviderScore> {
        scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }
}
