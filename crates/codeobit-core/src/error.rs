//! Error types for codeobit.

use crate::artifact::SaveOutcome;
use crate::router::ArgError;
use thiserror::Error;

/// Flat classification of [`CodeobitError`] used by callers that only need to
/// decide how to react (re-prompt, suggest a provider switch, exit code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    UnknownCommand,
    ArgError,
    UnknownProvider,
    PathTraversal,
    NotFound,
    SaveFailed,
    ProviderUnavailable,
    RateLimited,
    Io,
    Serialization,
    Config,
    Internal,
}

/// A shared error type for the entire codeobit workspace.
#[derive(Error, Debug, Clone)]
pub enum CodeobitError {
    /// Slash command name not present in the builtin table
    #[error("Unknown command: /{name}")]
    UnknownCommand { name: String },

    /// Slash command arguments could not be parsed
    #[error("Invalid arguments for /{command}: {error}")]
    Arg { command: String, error: ArgError },

    /// Provider id not present in the registry
    #[error("Unknown provider: '{id}'")]
    UnknownProvider { id: String },

    /// Logical path resolves outside of a storage root
    #[error("Path escapes storage root: '{path}'")]
    PathTraversal { path: String },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Every candidate save location failed
    #[error(
        "Save failed for '{logical_path}': all {} candidate location(s) failed",
        .outcome.attempted_locations.len()
    )]
    SaveFailed {
        logical_path: String,
        outcome: Box<SaveOutcome>,
    },

    /// AI provider could not be reached or refused the request
    #[error("Provider '{provider}' unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// AI provider throttled the request
    #[error("Provider '{provider}' rate limited: {message}")]
    RateLimited {
        provider: String,
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CodeobitError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a PathTraversal error
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a ProviderUnavailable error
    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    // ============================================================================
    // Classification
    // ============================================================================

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            Self::Arg { .. } => ErrorKind::ArgError,
            Self::UnknownProvider { .. } => ErrorKind::UnknownProvider,
            Self::PathTraversal { .. } => ErrorKind::PathTraversal,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SaveFailed { .. } => ErrorKind::SaveFailed,
            Self::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Io { .. } => ErrorKind::Io,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Errors raised by the AI collaborator.
    ///
    /// These are surfaced verbatim with a hint to retry or switch providers.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::RateLimited { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CodeobitError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CodeobitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CodeobitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CodeobitError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, CodeobitError>`.
pub type Result<T> = std::result::Result<T, CodeobitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CodeobitError::UnknownCommand {
                name: "nosuchcmd".into()
            }
            .kind(),
            ErrorKind::UnknownCommand
        );
        assert_eq!(
            CodeobitError::path_traversal("../x").kind(),
            ErrorKind::PathTraversal
        );
        assert_eq!(
            CodeobitError::not_found("artifact", "a.md").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: CodeobitError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("PermissionDenied"));
    }

    #[test]
    fn test_provider_errors_are_flagged() {
        let err = CodeobitError::RateLimited {
            provider: "gemini".into(),
            message: "slow down".into(),
            retry_after_secs: Some(3),
        };
        assert!(err.is_provider_error());
        assert!(!CodeobitError::config("x").is_provider_error());
    }
}
