//! AI provider identifiers and the registry used to validate switches.

use crate::error::{CodeobitError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Identifier of a remote completion provider.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderId {
    Gemini,
    #[strum(to_string = "openai", serialize = "gpt")]
    OpenAi,
    #[strum(to_string = "qwen3", serialize = "qwen")]
    Qwen3,
    Claude,
    DeepSeek,
    Mistral,
    Groq,
    OpenRouter,
}

impl ProviderId {
    /// Environment variable consulted for this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
            ProviderId::Qwen3 | ProviderId::OpenRouter => "OPENROUTER_API_KEY",
            ProviderId::Claude => "ANTHROPIC_API_KEY",
            ProviderId::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderId::Mistral => "MISTRAL_API_KEY",
            ProviderId::Groq => "GROQ_API_KEY",
        }
    }
}

/// Exact-match shortcut tokens that switch provider without further parsing.
const SHORTCUTS: &[(&str, ProviderId)] = &[
    ("!gpt", ProviderId::OpenAi),
    ("!gemini", ProviderId::Gemini),
    ("!qwen", ProviderId::Qwen3),
    ("!claude", ProviderId::Claude),
    ("!deepseek", ProviderId::DeepSeek),
    ("!mistral", ProviderId::Mistral),
    ("!groq", ProviderId::Groq),
    ("!openrouter", ProviderId::OpenRouter),
];

/// Looks up a `!shortcut` token (case-insensitive).
pub fn provider_shortcut(token: &str) -> Option<ProviderId> {
    SHORTCUTS
        .iter()
        .find(|(shortcut, _)| shortcut.eq_ignore_ascii_case(token))
        .map(|(_, id)| *id)
}

/// The fixed set of providers a session may switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    enabled: Vec<ProviderId>,
    default: ProviderId,
}

impl ProviderRegistry {
    /// Creates a registry from an enabled list and a default.
    ///
    /// The default is added to the enabled set if missing.
    pub fn new(enabled: Vec<ProviderId>, default: ProviderId) -> Self {
        let mut unique = Vec::with_capacity(enabled.len() + 1);
        for provider in std::iter::once(default).chain(enabled) {
            if !unique.contains(&provider) {
                unique.push(provider);
            }
        }
        Self {
            enabled: unique,
            default,
        }
    }

    /// Parses string ids (as found in config files) into a registry.
    pub fn from_names(enabled: &[String], default: &str) -> Result<Self> {
        let default = ProviderId::from_str(default.trim()).map_err(|_| {
            CodeobitError::UnknownProvider {
                id: default.to_string(),
            }
        })?;
        let enabled = enabled
            .iter()
            .map(|name| {
                ProviderId::from_str(name.trim()).map_err(|_| CodeobitError::UnknownProvider {
                    id: name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(enabled, default))
    }

    pub fn default_provider(&self) -> ProviderId {
        self.default
    }

    pub fn enabled(&self) -> &[ProviderId] {
        &self.enabled
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.enabled.contains(&id)
    }

    /// Validates a user-supplied id against the registry.
    pub fn resolve(&self, id: &str) -> Result<ProviderId> {
        ProviderId::from_str(id.trim())
            .ok()
            .filter(|provider| self.contains(*provider))
            .ok_or_else(|| CodeobitError::UnknownProvider { id: id.to_string() })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(ProviderId::iter().collect(), ProviderId::Gemini)
    }
}
