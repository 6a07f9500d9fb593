//! Platform paths for codeobit configuration and logs.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for codeobit.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/codeobit/          # Config directory (dirs::config_dir)
/// ├── config.toml              # Application configuration
/// ├── history.txt              # REPL line history
/// └── logs/                    # Application logs
///     └── codeobit.log.YYYY-MM-DD
///
/// <launch dir>/.codeobit/
/// ├── autosave/                # Versioned artifacts (AutoSaveManager)
/// └── project.toml             # Project notebook
/// ```
pub struct CodeobitPaths;

impl CodeobitPaths {
    const APP_NAME: &'static str = "codeobit";

    /// Returns the codeobit configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the REPL history file.
    pub fn history_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("history.txt"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file() {
        let Ok(config_dir) = CodeobitPaths::config_dir() else {
            return;
        };
        assert!(config_dir.ends_with("codeobit"));

        let config_file = CodeobitPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_logs_dir() {
        let Ok(logs_dir) = CodeobitPaths::logs_dir() else {
            return;
        };
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(CodeobitPaths::config_dir().unwrap()));
    }
}
