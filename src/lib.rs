//! Empty library target.
//!
//! This crate exists only to host the workspace's end-to-end integration
//! suite under `tests/`, exercising `llm-router` the way a real caller
//! would: real crate boundaries, mock adapters, no internals reached into.
