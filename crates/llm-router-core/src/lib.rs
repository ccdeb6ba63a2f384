//! Core infrastructure shared across the llm-router crates.
//!
//! This crate provides:
//! - the request/response/event data model
//! - the unified [`RouterError`] type
//! - the `on_route` observability hook plumbing

pub mod error;
pub mod events;
pub mod types;

pub use error::{AdapterError, RouterError};
pub use events::{OnRouteHook, RouteEvent};
pub use types::{ChatMessage, ChatOutcome, Priority, ProviderStatus, Request, Response};
