//! ClaudeClient - REST client for the Anthropic Messages API.

use crate::context_instruction;
use crate::http_error::{empty_response, map_http_error, map_request_error, parse_retry_after};
use codeobit_core::Result;
use codeobit_core::provider::ProviderId;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
const BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
        let request = CreateMessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            system: context_instruction(context),
        };
        tracing::debug!(model = %self.model, "Sending Claude request");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| map_request_error(ProviderId::Claude, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(
                ProviderId::Claude,
                status,
                error_message(&body),
                retry_after,
            ));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|err| map_request_error(ProviderId::Claude, err))?;
        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    r#type: Option<String>,
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .collect();
    if text.is_empty() {
        return Err(empty_response(ProviderId::Claude, "text content"));
    }
    Ok(text)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| match wrapper.error.r#type {
            Some(kind) => format!("{kind}: {}", wrapper.error.message),
            None => wrapper.error.message,
        })
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_skips_non_text_blocks() {
        let response: CreateMessageResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"done"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "done");

        let response: CreateMessageResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(extract_text_response(response).unwrap_err().is_provider_error());
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(error_message(body), "overloaded_error: Overloaded");
        assert_eq!(error_message("<html>"), "<html>");
    }

    #[test]
    fn test_request_omits_empty_system() {
        let request = CreateMessageRequest {
            model: DEFAULT_CLAUDE_MODEL.into(),
            messages: vec![Message {
                role: "user",
                content: "hi".into(),
            }],
            max_tokens: DEFAULT_MAX_TOKENS,
            system: context_instruction(""),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
        assert_eq!(value["max_tokens"], 4096);
    }
}
