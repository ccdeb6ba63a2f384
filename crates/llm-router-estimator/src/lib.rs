//! Pre-flight token count estimation.
//!
//! Counting tokens before routing lets the scorer compute accurate TPM
//! headroom, and lets `TokenLimitExceeded` be raised early rather than
//! discovered mid-request. Provider-specific tokenisers differ, but
//! `cl100k_base` is a close-enough approximation for routing decisions.
//! The estimate is intentionally conservative: better to slightly
//! over-count and route away from a nearly-full provider than to
//! under-count and hit a 429 later.

use std::sync::OnceLock;

use llm_router_core::ChatMessage;
use tiktoken_rs::CoreBPE;

const OVERHEAD_PER_MESSAGE: u32 = 4; // role + separators in chat format
const REPLY_PRIMER_OVERHEAD: u32 = 2;

/// Anything that can turn a chat transcript into an estimated token count.
/// The default implementation is `cl100k_base`-based; a vendor-specific
/// tokenizer can be swapped in by implementing this trait.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, messages: &[ChatMessage]) -> u32;
}

fn encoding() -> &'static CoreBPE {
    static ENCODING: OnceLock<CoreBPE> = OnceLock::new();
    ENCODING.get_or_init(|| {
        tiktoken_rs::cl100k_base().expect("cl100k_base encoding table is bundled with tiktoken-rs")
    })
}

/// Default token estimator: `cl100k_base`, loaded once into a process-wide
/// singleton since constructing the encoding table is expensive.
#[derive(Default, Clone, Copy)]
pub struct DefaultTokenEstimator;

impl TokenEstimator for DefaultTokenEstimator {
    fn estimate(&self, messages: &[ChatMessage]) -> u32 {
        let enc = encoding();
        let mut total: u32 = 0;
        for message in messages {
            total += OVERHEAD_PER_MESSAGE;
            total += enc.encode_with_special_tokens(&message.role).len() as u32;
            total += enc.encode_with_special_tokens(&message.content).len() as u32;
        }
        total + REPLY_PRIMER_OVERHEAD
    }
}
