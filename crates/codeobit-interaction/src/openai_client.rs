//! Client for OpenAI-style `chat/completions` endpoints.
//!
//! OpenAI, DeepSeek, Mistral, Groq and OpenRouter (including Qwen models
//! served through it) all speak this protocol.

use crate::context_instruction;
use crate::http_error::{empty_response, map_http_error, map_request_error, parse_retry_after};
use codeobit_core::provider::ProviderId;
use codeobit_core::{CodeobitError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default endpoint and model for one OpenAI-compatible provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAiEndpoint {
    pub provider: ProviderId,
    pub base_url: &'static str,
    pub default_model: &'static str,
    /// OpenRouter asks callers to identify themselves
    pub attribution_headers: bool,
}

const ENDPOINTS: &[OpenAiEndpoint] = &[
    OpenAiEndpoint {
        provider: ProviderId::OpenAi,
        base_url: "https://api.openai.com/v1",
        default_model: "gpt-4o",
        attribution_headers: false,
    },
    OpenAiEndpoint {
        provider: ProviderId::Qwen3,
        base_url: "https://openrouter.ai/api/v1",
        default_model: "qwen/qwen-2.5-72b-instruct",
        attribution_headers: true,
    },
    OpenAiEndpoint {
        provider: ProviderId::DeepSeek,
        base_url: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        attribution_headers: false,
    },
    OpenAiEndpoint {
        provider: ProviderId::Mistral,
        base_url: "https://api.mistral.ai/v1",
        default_model: "mistral-large-latest",
        attribution_headers: false,
    },
    OpenAiEndpoint {
        provider: ProviderId::Groq,
        base_url: "https://api.groq.com/openai/v1",
        default_model: "llama-3.1-70b-versatile",
        attribution_headers: false,
    },
    OpenAiEndpoint {
        provider: ProviderId::OpenRouter,
        base_url: "https://openrouter.ai/api/v1",
        default_model: "meta-llama/llama-3.1-405b-instruct",
        attribution_headers: true,
    },
];

impl OpenAiEndpoint {
    /// `None` for providers with their own protocol (Gemini, Claude).
    pub fn for_provider(provider: ProviderId) -> Option<&'static OpenAiEndpoint> {
        ENDPOINTS.iter().find(|endpoint| endpoint.provider == provider)
    }
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    provider: ProviderId,
    api_key: String,
    model: String,
    base_url: String,
    attribution_headers: bool,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleClient {
    pub fn new(client: Client, endpoint: &OpenAiEndpoint, api_key: impl Into<String>) -> Self {
        Self {
            client,
            provider: endpoint.provider,
            api_key: api_key.into(),
            model: endpoint.default_model.to_string(),
            base_url: endpoint.base_url.to_string(),
            attribution_headers: endpoint.attribution_headers,
            max_tokens: None,
        }
    }

    /// Looks up the endpoint for `provider`.
    pub fn for_provider(
        client: Client,
        provider: ProviderId,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = OpenAiEndpoint::for_provider(provider).ok_or_else(|| {
            CodeobitError::internal(format!("{provider} does not use the chat completions API"))
        })?;
        Ok(Self::new(client, endpoint, api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(prompt, context),
            max_tokens: self.max_tokens,
        };
        tracing::debug!(provider = %self.provider, model = %self.model, "Sending chat completion request");

        let mut builder = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&request);
        if self.attribution_headers {
            builder = builder
                .header("HTTP-Referer", "https://codeobit.dev")
                .header("X-Title", "codeobit");
        }

        let response = builder
            .send()
            .await
            .map_err(|err| map_request_error(self.provider, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(
                self.provider,
                status,
                error_message(&body),
                retry_after,
            ));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| map_request_error(self.provider, err))?;
        extract_text_response(self.provider, parsed)
    }
}

fn build_messages(prompt: &str, context: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = context_instruction(context) {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt.to_string(),
    });
    messages
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(provider: ProviderId, response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| empty_response(provider, "message content"))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string())
}
