//! Adaptive, rate-limit-aware routing across LLM providers.
//!
//! `LLMRouter` dispatches chat requests across a set of registered
//! provider adapters, choosing among them using a live picture of each
//! provider's remaining RPM/TPM headroom, latency, static preference
//! weight and quota-exhaustion risk. Failed providers are skipped via a
//! per-provider circuit breaker and the request falls back to the next
//! best candidate; session affinity keeps related requests sticky to the
//! same provider once one has served them successfully.
//!
//! ```no_run
//! use std::sync::Arc;
//! use llm_router::{LLMRouter, RouterConfig};
//! use llm_router_core::{ChatMessage, Request};
//!
//! # async fn example(openai: Arc<dyn llm_router_registry::ProviderAdapter>) -> Result<(), llm_router_core::RouterError> {
//! let config = RouterConfig::builder().provider(openai).build();
//! let router = LLMRouter::new(config);
//!
//! let request = Request::builder(vec![ChatMessage::user("hello")])
//!     .build()
//!     .expect("valid request");
//! let response = router.chat(request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

mod config;
mod router;

pub use config::{CircuitBreakerSettings, RouterConfig, RouterConfigBuilder, RoutingWeights};
pub use router::LLMRouter;

pub use llm_router_core as core;
pub use llm_router_registry as registry;
