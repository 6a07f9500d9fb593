//! Loads `AppConfig` from `config.toml` plus environment overrides.

use crate::paths::CodeobitPaths;
use crate::storage::AtomicTomlFile;
use codeobit_core::config::AppConfig;
use codeobit_core::provider::ProviderId;
use codeobit_core::{CodeobitError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Resolves, reads and validates the application configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Uses `path` when given, otherwise `<config_dir>/codeobit/config.toml`.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => CodeobitPaths::config_file().map_err(|e| CodeobitError::config(e.to_string()))?,
        };
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file (defaults when missing), applies `<PROVIDER>_API_KEY`
    /// environment variables, then validates.
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = AtomicTomlFile::<AppConfig>::new(self.path.clone())
            .load()
            .map_err(|e| {
                CodeobitError::config(format!("{}: {}", self.path.display(), e))
            })?
            .unwrap_or_else(|| {
                tracing::debug!(path = %self.path.display(), "No config file, using defaults");
                AppConfig::default()
            });

        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }
}

/// Fills provider API keys from the environment; environment values win.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for provider in ProviderId::iter() {
        let Some(value) = lookup(provider.api_key_env()).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        let settings = &mut config.providers.settings;
        let key = settings
            .keys()
            .find(|key| ProviderId::from_str(key).ok() == Some(provider))
            .cloned()
            .unwrap_or_else(|| provider.to_string());
        settings.entry(key).or_default().api_key = Some(value);
    }
}
