//! Boundaries to the remote collaborators.
//!
//! Retries and backoff are left to callers.

use crate::error::Result;
use crate::provider::ProviderId;
use async_trait::async_trait;

/// Black-box text completion.
///
/// Implementations fail with `ProviderUnavailable` or `RateLimited`.
#[async_trait]
pub trait AiCompleter: Send + Sync {
    /// `context` is the rendered session summary; `prompt` is the request
    /// with any system instruction and file contents already applied.
    async fn complete(&self, prompt: &str, context: &str, provider: ProviderId) -> Result<String>;
}

/// A fetched web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPage {
    pub url: String,
    pub title: Option<String>,
    /// Visible text with markup removed
    pub text: String,
}

#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<WebPage>;
}
