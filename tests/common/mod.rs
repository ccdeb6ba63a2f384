//! Scripted provider adapter shared by the integration suite.
//!
//! Each [`MockAdapter`] is configured with a queue of `chat` outcomes and a
//! queue of `stream` chunk sequences, consumed in order as the router
//! attempts it. This lets a test express "the first call to A fails, the
//! second succeeds" without needing a real vendor SDK.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};

use llm_router_core::{AdapterError, ChatMessage, ChatOutcome};
use llm_router_registry::{ChatChunk, ProviderAdapter, ProviderSpec};

#[derive(Debug, Clone)]
pub enum ScriptedChat {
    Ok {
        content: &'static str,
        input_tokens: u32,
        output_tokens: u32,
    },
    Fail(&'static str),
}

pub type ScriptedStream = Vec<Result<&'static str, &'static str>>;

pub struct MockAdapter {
    spec: ProviderSpec,
    chat_script: Mutex<VecDeque<ScriptedChat>>,
    stream_script: Mutex<VecDeque<ScriptedStream>>,
    chat_calls: AtomicU32,
    stream_calls: AtomicU32,
}

impl MockAdapter {
    pub fn new(spec: ProviderSpec) -> Self {
        Self {
            spec,
            chat_script: Mutex::new(VecDeque::new()),
            stream_script: Mutex::new(VecDeque::new()),
            chat_calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
        }
    }

    /// Every `chat` call returns this same outcome, indefinitely.
    pub fn always_succeeds(spec: ProviderSpec, content: &'static str) -> Arc<Self> {
        let adapter = Self::new(spec);
        adapter.push_chat(ScriptedChat::Ok {
            content,
            input_tokens: 10,
            output_tokens: 5,
        });
        Arc::new(adapter)
    }

    /// Every `chat` call fails with `reason`, indefinitely.
    pub fn always_fails(spec: ProviderSpec, reason: &'static str) -> Arc<Self> {
        let adapter = Self::new(spec);
        adapter.push_chat(ScriptedChat::Fail(reason));
        Arc::new(adapter)
    }

    /// Queue a scripted `chat` response. While more than one entry is
    /// queued, calls consume them in order; the last entry queued is
    /// replayed indefinitely once the queue is down to one, so tests don't
    /// need to script every possible attempt.
    pub fn push_chat(&self, outcome: ScriptedChat) {
        self.chat_script.lock().unwrap().push_back(outcome);
    }

    pub fn push_stream(&self, chunks: ScriptedStream) {
        self.stream_script.lock().unwrap().push_back(chunks);
    }

    pub fn chat_call_count(&self) -> u32 {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn stream_call_count(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn next_chat(&self) -> ScriptedChat {
        let mut script = self.chat_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().expect("non-empty")
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(ScriptedChat::Fail("no scripted response"))
        }
    }

    fn next_stream(&self) -> ScriptedStream {
        let mut script = self.stream_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().expect("non-empty")
        } else {
            script.front().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<ChatOutcome, AdapterError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_chat() {
            ScriptedChat::Ok {
                content,
                input_tokens,
                output_tokens,
            } => Ok(ChatOutcome {
                content: content.to_string(),
                input_tokens,
                output_tokens,
            }),
            ScriptedChat::Fail(reason) => Err(reason.into()),
        }
    }

    async fn stream(
        &self,
        _messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<BoxStream<'static, ChatChunk>, AdapterError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.next_stream();
        let items: Vec<ChatChunk> = script
            .into_iter()
            .map(|r| r.map(|s| s.to_string()).map_err(|e| e.into()))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

pub fn spec(name: &str, rpm: u32, tpm: u32) -> ProviderSpec {
    ProviderSpec::new(name, format!("{name}-model"), rpm, tpm).unwrap()
}
