//! Unified error handling for the router.
//!
//! `RouterError` is the single error type callers ever see. `CircuitOpen`
//! is intentionally not a variant here: it never escapes the breaker/
//! router boundary, matching the "internal-only" contract: the router
//! catches it and moves to the next candidate rather than surfacing it.

/// Opaque error returned by a provider adapter call. The router never
/// downcasts this; adapter-specific error handling stays inside the
/// adapter.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// `chat`/`stream`/`status` called with no providers registered.
    #[error("no providers are registered")]
    NoProvidersConfigured,

    /// The estimated token count for the request exceeds the TPM limit of
    /// every enabled provider.
    #[error("estimated token count exceeds the TPM limit of every available provider")]
    TokenLimitExceeded,

    /// Every candidate provider was attempted and failed.
    #[error("all {attempts} provider(s) failed")]
    AllProvidersFailed {
        attempts: u32,
        errors: Vec<(String, AdapterError)>,
    },

    /// A streaming provider failed after it had already yielded at least
    /// one chunk. Fallback is only legal before the first chunk; once the
    /// caller has received output, a second provider's output could not be
    /// spliced in cleanly, so the failure surfaces directly instead of
    /// triggering a retry.
    #[error("provider '{provider}' failed mid-stream: {source}")]
    StreamFailedAfterStart {
        provider: String,
        #[source]
        source: AdapterError,
    },

    /// Lazy initialisation of the shared-storage state backend failed
    /// (e.g. could not connect to Redis). Not part of the original
    /// taxonomy this crate is modeled on: an unconditional dependency on
    /// a reachable backend is a concern the in-process default doesn't
    /// have, so it gets its own variant rather than overloading one above.
    #[error("failed to initialise shared state backend: {0}")]
    StateBackendUnavailable(String),
}

impl RouterError {
    pub fn is_no_providers_configured(&self) -> bool {
        matches!(self, RouterError::NoProvidersConfigured)
    }

    pub fn is_token_limit_exceeded(&self) -> bool {
        matches!(self, RouterError::TokenLimitExceeded)
    }

    pub fn is_all_providers_failed(&self) -> bool {
        matches!(self, RouterError::AllProvidersFailed { .. })
    }
}

/// Raised internally when a provider's circuit breaker is open. The router
/// catches this in the attempt loop and skips to the next candidate; it is
/// never converted into a [`RouterError`] variant and never reaches the caller.
#[derive(Debug, thiserror::Error)]
#[error("circuit breaker is open for provider '{0}'")]
pub struct CircuitOpenError(pub String);
