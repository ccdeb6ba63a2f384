//! The `on_route` observability hook.
//!
//! Fired once per completed routing attempt (success or the final
//! exhaustion of the fallback chain is *not* an event; only successful
//! dispatches produce a [`RouteEvent`], matching the original contract).
//! A panicking or failing hook must never affect routing: errors are
//! swallowed the same way `EventListeners::emit` swallows a panicking
//! listener.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;

use crate::types::Priority;

/// Fired after every successful routing decision via the optional
/// `on_route` hook. Forward this to a metrics backend, Slack, Sentry, or
/// any internal system.
#[derive(Debug, Clone)]
pub struct RouteEvent {
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: f64,
    /// Remaining capacity percentage at the time of routing.
    pub headroom_pct: f64,
    pub circuit_open: bool,
    pub attempt_number: u32,
    pub session_id: Option<String>,
    pub priority: Priority,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A caller-supplied async callback invoked with each [`RouteEvent`].
///
/// Cloneable handle around a boxed closure so it can be shared between the
/// `Router` and its config without forcing callers to write a named type.
#[derive(Clone)]
pub struct OnRouteHook(Arc<dyn Fn(RouteEvent) -> BoxFuture<'static, ()> + Send + Sync>);

impl OnRouteHook {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RouteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move |event| Box::pin(f(event))))
    }

    /// Invoke the hook, swallowing any panic so a misbehaving callback
    /// can never affect the routing decision that just completed.
    pub async fn fire(&self, event: RouteEvent) {
        let fut = (self.0)(event);
        // AssertUnwindSafe: the hook only observes the event by value: a
        // panic mid-callback cannot leave router state half-mutated.
        let result = std::panic::AssertUnwindSafe(fut).catch_unwind().await;
        if let Err(_panic) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!("on_route hook panicked; routing result is unaffected");
        }
    }
}

impl std::fmt::Debug for OnRouteHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OnRouteHook(..)")
    }
}
