//! Application configuration model (`config.toml`).

use crate::error::{CodeobitError, Result};
use crate::provider::{ProviderId, ProviderRegistry};
use crate::session::{DEFAULT_MAX_TURNS, Theme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use strum::IntoEnumIterator;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionSettings,
    pub autosave: AutoSaveSettings,
    pub providers: ProviderSettings,
    pub ui: UiSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub max_turns: usize,
    /// Character budget for the history rendered into each AI request
    pub summary_max_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            summary_max_chars: 6000,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AutoSaveSettings {
    pub interval_secs: u64,
    pub flush_timeout_secs: u64,
    /// Overrides `<project>/.codeobit/autosave`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            flush_timeout_secs: 5,
            directory: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderSettings {
    pub default: String,
    /// Empty means every known provider
    pub enabled: Vec<String>,
    /// Per-provider overrides keyed by provider id
    pub settings: BTreeMap<String, ProviderConfig>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default: ProviderId::Gemini.to_string(),
            enabled: Vec::new(),
            settings: BTreeMap::new(),
        }
    }
}

/// Connection settings for one provider.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UiSettings {
    pub theme: Theme,
}

impl AppConfig {
    /// Rejects configurations the application cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.autosave.interval_secs == 0 {
            return Err(CodeobitError::config("autosave.interval_secs must be > 0"));
        }
        if self.autosave.flush_timeout_secs == 0 {
            return Err(CodeobitError::config(
                "autosave.flush_timeout_secs must be > 0",
            ));
        }
        for key in self.providers.settings.keys() {
            if ProviderId::from_str(key).is_err() {
                return Err(CodeobitError::config(format!(
                    "unknown provider in [providers.settings.{key}]"
                )));
            }
        }
        self.registry().map(|_| ())
    }

    pub fn registry(&self) -> Result<ProviderRegistry> {
        let registry = if self.providers.enabled.is_empty() {
            let default = ProviderId::from_str(self.providers.default.trim()).map_err(|_| {
                CodeobitError::config(format!(
                    "unknown default provider '{}'",
                    self.providers.default
                ))
            })?;
            ProviderRegistry::new(ProviderId::iter().collect(), default)
        } else {
            ProviderRegistry::from_names(&self.providers.enabled, &self.providers.default)
                .map_err(|e| CodeobitError::config(e.to_string()))?
        };
        Ok(registry)
    }

    /// Settings for `provider`, matched by id or alias.
    pub fn provider_config(&self, provider: ProviderId) -> ProviderConfig {
        self.providers
            .settings
            .iter()
            .find(|(key, _)| ProviderId::from_str(key).ok() == Some(provider))
            .map(|(_, config)| config.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.session.max_turns, 50);
        assert_eq!(config.autosave.interval_secs, 30);
        assert!(config.validate().is_ok());

        let registry = config.registry().unwrap();
        assert_eq!(registry.default_provider(), ProviderId::Gemini);
        assert_eq!(registry.enabled().len(), ProviderId::iter().count());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [autosave]
            interval_secs = 10

            [providers]
            default = "claude"
            enabled = ["claude", "gpt"]

            [providers.settings.claude]
            model = "claude-sonnet-4-5"

            [ui]
            theme = "dark"
            "#,
        )
        .unwrap();

        assert_eq!(config.autosave.interval_secs, 10);
        assert_eq!(config.autosave.flush_timeout_secs, 5);
        assert_eq!(config.ui.theme, Theme::Dark);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.provider_config(ProviderId::Claude).model.as_deref(),
            Some("claude-sonnet-4-5")
        );
        assert_eq!(config.provider_config(ProviderId::Groq), ProviderConfig::default());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let mut config = AppConfig::default();
        config.autosave.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.providers.default = "skynet".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config
            .providers
            .settings
            .insert("skynet".into(), ProviderConfig::default());
        assert!(config.validate().is_err());
    }
}
