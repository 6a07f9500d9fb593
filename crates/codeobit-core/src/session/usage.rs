//! Rough per-session token accounting.

use serde::{Deserialize, Serialize};

/// Estimated tokens for `text`: about 1.3 tokens per whitespace-separated word.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    (words * 13).div_ceil(10)
}

/// Token estimates accumulated over the AI requests of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn record(&mut self, prompt: &str, response: &str) {
        self.requests += 1;
        self.input_tokens += estimate_tokens(prompt);
        self.output_tokens += estimate_tokens(response);
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
