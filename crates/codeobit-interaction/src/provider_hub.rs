//! Dispatches completions to the client for the requested provider.

use crate::claude_client::{ClaudeClient, DEFAULT_CLAUDE_MODEL};
use crate::gemini_client::{DEFAULT_GEMINI_MODEL, GeminiClient};
use crate::openai_client::OpenAiCompatibleClient;
use async_trait::async_trait;
use codeobit_core::ai::AiCompleter;
use codeobit_core::config::{AppConfig, ProviderConfig};
use codeobit_core::provider::ProviderId;
use codeobit_core::{CodeobitError, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use strum::IntoEnumIterator;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// [`AiCompleter`] over every supported provider, configured from
/// `[providers.settings.*]`.
pub struct ProviderHub {
    client: Client,
    settings: HashMap<ProviderId, ProviderConfig>,
}

impl ProviderHub {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CodeobitError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &AppConfig) -> Self {
        let settings = ProviderId::iter()
            .map(|provider| (provider, config.provider_config(provider)))
            .collect();
        Self { client, settings }
    }

    /// Whether an API key is available for `provider`.
    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.api_key(provider).is_ok()
    }

    /// Model that requests to `provider` will use.
    pub fn model_for(&self, provider: ProviderId) -> String {
        let configured = self
            .settings
            .get(&provider)
            .and_then(|settings| settings.model.clone());
        configured.unwrap_or_else(|| match provider {
            ProviderId::Gemini => DEFAULT_GEMINI_MODEL.to_string(),
            ProviderId::Claude => DEFAULT_CLAUDE_MODEL.to_string(),
            other => crate::OpenAiEndpoint::for_provider(other)
                .map(|endpoint| endpoint.default_model.to_string())
                .unwrap_or_default(),
        })
    }

    fn api_key(&self, provider: ProviderId) -> Result<&str> {
        self.settings
            .get(&provider)
            .and_then(|settings| settings.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CodeobitError::provider_unavailable(
                    provider.to_string(),
                    format!(
                        "no API key configured; set {} or [providers.settings.{}] api_key",
                        provider.api_key_env(),
                        provider
                    ),
                )
            })
    }

    fn base_url(&self, provider: ProviderId) -> Option<&str> {
        self.settings
            .get(&provider)
            .and_then(|settings| settings.base_url.as_deref())
    }
}

#[async_trait]
impl AiCompleter for ProviderHub {
    async fn complete(&self, prompt: &str, context: &str, provider: ProviderId) -> Result<String> {
        let api_key = self.api_key(provider)?;
        let model = self.model_for(provider);
        tracing::info!(%provider, %model, prompt_chars = prompt.len(), "Requesting completion");

        let result = match provider {
            ProviderId::Gemini => {
                let mut client = GeminiClient::new(self.client.clone(), api_key, model);
                if let Some(url) = self.base_url(provider) {
                    client = client.with_base_url(url);
                }
                client.complete(prompt, context).await
            }
            ProviderId::Claude => {
                let mut client = ClaudeClient::new(self.client.clone(), api_key, model);
                if let Some(url) = self.base_url(provider) {
                    client = client.with_base_url(url);
                }
                client.complete(prompt, context).await
            }
            other => {
                let mut client =
                    OpenAiCompatibleClient::for_provider(self.client.clone(), other, api_key)?
                        .with_model(model);
                if let Some(url) = self.base_url(provider) {
                    client = client.with_base_url(url);
                }
                client.complete(prompt, context).await
            }
        };

        if let Err(err) = &result {
            tracing::warn!(%provider, error = %err, "Completion failed");
        }
        result
    }
}
