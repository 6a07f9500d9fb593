//! Artifact domain models.

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Kind of generated output.
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
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Doc,
    Test,
    Report,
}

impl ArtifactKind {
    /// Canonical directory for this kind inside a project root.
    pub fn project_subdir(&self) -> &'static str {
        match self {
            ArtifactKind::Code => "src",
            ArtifactKind::Doc => "docs",
            ArtifactKind::Test => "tests",
            ArtifactKind::Report => "reports",
        }
    }

    /// Extension used when no better one can be inferred from the content.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ArtifactKind::Code | ArtifactKind::Test => "txt",
            ArtifactKind::Doc | ArtifactKind::Report => "md",
        }
    }
}

/// Reference to a named unit of generated output.
///
/// Never mutated after creation; new content for the same logical path is
/// recorded as a new [`ArtifactVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    logical_path: String,
    kind: ArtifactKind,
    created_at: DateTime<Utc>,
}

impl ArtifactRef {
    pub fn new(logical_path: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            logical_path: logical_path.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a reference read back from storage.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One of the ordered destinations attempted when saving an artifact.
///
/// The declaration order is the attempt order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SaveLocation {
    AutoSaveDir,
    ExplicitTarget,
    ProjectDir,
}

/// SHA-256 digest of artifact content, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted revision of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub artifact_ref: ArtifactRef,
    pub content: String,
    /// Strictly increasing per logical path, starting at 1
    pub version_index: u64,
    pub save_location: SaveLocation,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
}

/// Result of a single location attempt inside a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationAttempt {
    pub location: SaveLocation,
    /// Physical path written (or that would have been written)
    pub physical_path: Option<PathBuf>,
    pub error: Option<LocationError>,
}

/// Why a location attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl LocationAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one save request, returned for logging and UI feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub logical_path: String,
    pub version_index: u64,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    /// Every location attempted, in attempt order
    pub attempted_locations: Vec<LocationAttempt>,
    /// Earliest location (in candidate order) that holds the new version
    pub succeeded_at: Option<SaveLocation>,
    /// Set only when every attempted location failed
    pub error: Option<ErrorKind>,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        self.succeeded_at.is_some()
    }

    /// Whether the explicit user target was written.
    ///
    /// `None` when the save had no explicit target.
    pub fn saved_to_target(&self) -> Option<bool> {
        self.attempt(SaveLocation::ExplicitTarget)
            .map(LocationAttempt::succeeded)
    }

    pub fn attempt(&self, location: SaveLocation) -> Option<&LocationAttempt> {
        self.attempted_locations
            .iter()
            .find(|attempt| attempt.location == location)
    }

    pub fn failures(&self) -> impl Iterator<Item = &LocationAttempt> {
        self.attempted_locations
            .iter()
            .filter(|attempt| !attempt.succeeded())
    }

    /// Physical path of the earliest successful location.
    pub fn primary_path(&self) -> Option<&PathBuf> {
        let location = self.succeeded_at?;
        self.attempt(location)
            .and_then(|attempt| attempt.physical_path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_and_distinct() {
        let a = ContentHash::of(b"A");
        let b = ContentHash::of(b"B");
        assert_eq!(a, ContentHash::of(b"A"));
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn test_save_location_order_matches_attempt_order() {
        assert!(SaveLocation::AutoSaveDir < SaveLocation::ExplicitTarget);
        assert!(SaveLocation::ExplicitTarget < SaveLocation::ProjectDir);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("code".parse::<ArtifactKind>().ok(), Some(ArtifactKind::Code));
        assert_eq!(ArtifactKind::Test.project_subdir(), "tests");
        assert_eq!(ArtifactKind::Report.to_string(), "report");
    }

    #[test]
    fn test_saved_to_target_reports_explicit_attempt() {
        let outcome = SaveOutcome {
            logical_path: "report.md".into(),
            version_index: 1,
            content_hash: ContentHash::of(b"x"),
            size_bytes: 1,
            attempted_locations: vec![
                LocationAttempt {
                    location: SaveLocation::AutoSaveDir,
                    physical_path: Some(PathBuf::from("/tmp/a")),
                    error: None,
                },
                LocationAttempt {
                    location: SaveLocation::ExplicitTarget,
                    physical_path: None,
                    error: Some(LocationError {
                        kind: ErrorKind::Io,
                        message: "read-only".into(),
                    }),
                },
            ],
            succeeded_at: Some(SaveLocation::AutoSaveDir),
            error: None,
        };

        assert!(outcome.is_saved());
        assert_eq!(outcome.saved_to_target(), Some(false));
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(outcome.primary_path(), Some(&PathBuf::from("/tmp/a")));
    }
}
