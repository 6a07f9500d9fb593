//! HTTP collaborators: AI completion providers and the web page fetcher.

pub mod claude_client;
pub mod gemini_client;
mod http_error;
pub mod openai_client;
pub mod provider_hub;
pub mod web_fetcher;

pub use claude_client::ClaudeClient;
pub use gemini_client::GeminiClient;
pub use openai_client::{OpenAiCompatibleClient, OpenAiEndpoint};
pub use provider_hub::ProviderHub;
pub use web_fetcher::HttpWebFetcher;

/// Frames the session summary as a system message; `None` when empty.
pub(crate) fn context_instruction(context: &str) -> Option<String> {
    let context = context.trim();
    if context.is_empty() {
        None
    } else {
        Some(format!(
            "You are codeobit, an AI software engineering assistant.\n\nConversation so far:\n{context}"
        ))
    }
}
