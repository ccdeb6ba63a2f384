//! State backends: sliding-window RPM/TPM usage accounting and session
//! affinity.
//!
//! [`InMemoryStateBackend`] is the zero-dependency default, appropriate for
//! single-instance deployments. Enable the `redis-backend` feature for
//! [`RedisStateBackend`], which gives every instance in a fleet the same
//! accurate picture of provider usage.

mod memory;
#[cfg(feature = "redis-backend")]
mod redis_backend;

pub use memory::InMemoryStateBackend;
#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisStateBackend;

use async_trait::async_trait;

/// Interface every state backend implements.
///
/// Responsible for:
/// - tracking per-provider RPM (request count in a rolling window)
/// - tracking per-provider TPM (token count in a rolling window)
/// - session → provider affinity (sticky routing)
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Record a completed request for `provider`. `tokens` is the total
    /// (input + output) token count consumed. Entries older than
    /// `window_seconds` are eligible for purge on the next read.
    async fn record_request(&self, provider: &str, tokens: u64, window_seconds: u64);

    /// Return `(rpm, tpm)`: request count and token count within the
    /// rolling window.
    async fn get_usage(&self, provider: &str, window_seconds: u64) -> (u64, u64);

    /// Return the provider pinned for `session_id`, if any and unexpired.
    async fn get_session_provider(&self, session_id: &str) -> Option<String>;

    /// Pin `provider` for `session_id`. Expires after `ttl_seconds`.
    async fn set_session_provider(&self, session_id: &str, provider: &str, ttl_seconds: u64);

    /// Release any resources held by this backend (connections, etc.).
    async fn close(&self) {}
}
