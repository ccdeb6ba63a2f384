//! In-process, in-memory state backend.
//!
//! All state is lost on process exit. Each provider maintains a deque of
//! `(instant, tokens)` entries; on every read the deque is purged of
//! entries older than `window_seconds`, so RPM = deque length and
//! TPM = sum of the token counts.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::StateBackend;

struct Window {
    entries: VecDeque<(Instant, u64)>,
}

impl Window {
    fn purge(&mut self, window_seconds: u64) {
        let cutoff = Instant::now()
            .checked_sub(Duration::from_secs(window_seconds))
            .unwrap_or_else(Instant::now);
        while let Some((ts, _)) = self.entries.front() {
            if *ts < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

struct SessionEntry {
    provider: String,
    expires_at: Instant,
}

/// In-process sliding-window state backend (default, zero deps).
#[derive(Default)]
pub struct InMemoryStateBackend {
    windows: Mutex<HashMap<String, Window>>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl InMemoryStateBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateBackend for InMemoryStateBackend {
    async fn record_request(&self, provider: &str, tokens: u64, window_seconds: u64) {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(provider.to_string()).or_insert_with(|| Window {
            entries: VecDeque::new(),
        });
        window.entries.push_back((Instant::now(), tokens));
        window.purge(window_seconds);
    }

    async fn get_usage(&self, provider: &str, window_seconds: u64) -> (u64, u64) {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(provider.to_string()).or_insert_with(|| Window {
            entries: VecDeque::new(),
        });
        window.purge(window_seconds);
        let rpm = window.entries.len() as u64;
        let tpm = window.entries.iter().map(|(_, t)| t).sum();
        (rpm, tpm)
    }

    async fn get_session_provider(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.provider.clone()),
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }

    async fn set_session_provider(&self, session_id: &str, provider: &str, ttl_seconds: u64) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                provider: provider.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
    }
}
