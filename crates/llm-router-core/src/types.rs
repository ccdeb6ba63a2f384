//! Request/response data model.
//!
//! Mirrors the public API surface described for `RouterRequest` /
//! `RouterResponse` / `ProviderConfig`: these types are part of the stable
//! contract between callers and the router.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single chat message in the conventional `role`/`content` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Request priority. A closed set: construction from an unrecognised
/// string is rejected at the boundary rather than silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!(
                "priority must be one of 'low', 'normal', 'high', got '{other}'"
            )),
        }
    }
}

/// A routing request submitted by the caller.
#[derive(Debug, Clone)]
pub struct Request {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub priority: Priority,
    pub session_id: Option<String>,
    pub force_provider: Option<String>,
}

/// Error returned when constructing a [`Request`] with an out-of-range field.
#[derive(Debug, thiserror::Error)]
pub enum RequestBuildError {
    #[error("max_tokens must be > 0")]
    InvalidMaxTokens,
    #[error("temperature must be within 0.0..=2.0, got {0}")]
    InvalidTemperature(f32),
}

pub struct RequestBuilder {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    priority: Priority,
    session_id: Option<String>,
    force_provider: Option<String>,
}

impl Request {
    pub fn builder(messages: Vec<ChatMessage>) -> RequestBuilder {
        RequestBuilder {
            messages,
            max_tokens: 1024,
            temperature: 0.7,
            priority: Priority::Normal,
            session_id: None,
            force_provider: None,
        }
    }
}

impl RequestBuilder {
    pub fn max_tokens(mut self, v: u32) -> Self {
        self.max_tokens = v;
        self
    }

    pub fn temperature(mut self, v: f32) -> Self {
        self.temperature = v;
        self
    }

    pub fn priority(mut self, v: Priority) -> Self {
        self.priority = v;
        self
    }

    pub fn session_id(mut self, v: impl Into<String>) -> Self {
        self.session_id = Some(v.into());
        self
    }

    pub fn force_provider(mut self, v: impl Into<String>) -> Self {
        self.force_provider = Some(v.into());
        self
    }

    pub fn build(self) -> Result<Request, RequestBuildError> {
        if self.max_tokens == 0 {
            return Err(RequestBuildError::InvalidMaxTokens);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RequestBuildError::InvalidTemperature(self.temperature));
        }
        Ok(Request {
            messages: self.messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            priority: self.priority,
            session_id: self.session_id,
            force_provider: self.force_provider,
        })
    }
}

/// The outcome of a non-streaming adapter call.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The result returned to the caller after a successful routing decision.
#[derive(Debug, Clone)]
pub struct Response {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: f64,
    /// Number of providers tried before success (1 = no fallback needed).
    pub attempts: u32,
}

/// Status snapshot for a single provider, as returned by `Router::status`.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub rpm_used: u64,
    pub rpm_limit: u32,
    pub tpm_used: u64,
    pub tpm_limit: u32,
    pub headroom_pct: f64,
    pub circuit_open: bool,
    pub avg_latency_ms: f64,
}
