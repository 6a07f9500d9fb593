//! On-disk version records.
//!
//! ```text
//! <autosave_dir>/<sanitized logical path>-<path hash>/
//! ├── manifest.toml      # ArtifactManifest
//! ├── index.toml         # IndexLedger
//! ├── v000001.auto
//! └── v000002.auto
//! <base_dir>/.codeobit/index/<sanitized logical path>-<path hash>.toml
//!                        # IndexLedger copy outside the auto-save directory
//! <dir>/<file>           # explicit target or project copy
//! <dir>/.<file>.version.toml   # VersionSidecar for that copy
//! ```

use crate::storage::{AtomicFileError, AtomicTomlFile};
use chrono::{DateTime, Utc};
use codeobit_core::artifact::{ArtifactKind, ContentHash};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.toml";
pub const INDEX_FILE: &str = "index.toml";
/// Ledger directory relative to the manager's base directory.
pub const INDEX_LEDGER_DIR: &str = ".codeobit/index";

/// File name of the n-th auto-saved version.
pub fn version_file_name(version_index: u64) -> String {
    format!("v{:06}.auto", version_index)
}

/// Version history of one logical path in the auto-save directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArtifactManifest {
    pub logical_path: String,
    pub kind: ArtifactKind,
    #[serde(default)]
    pub versions: Vec<ManifestEntry>,
}

impl ArtifactManifest {
    pub fn new(logical_path: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            logical_path: logical_path.into(),
            kind,
            versions: Vec::new(),
        }
    }

    pub fn latest_index(&self) -> u64 {
        self.versions
            .iter()
            .map(|v| v.version_index)
            .max()
            .unwrap_or(0)
    }

    pub fn entry(&self, version_index: u64) -> Option<&ManifestEntry> {
        self.versions
            .iter()
            .find(|v| v.version_index == version_index)
    }

    /// Explicit targets that ever received a version, oldest first.
    pub fn explicit_targets(&self) -> Vec<PathBuf> {
        let mut targets: Vec<PathBuf> = Vec::new();
        for target in self.versions.iter().filter_map(|v| v.explicit_target.as_ref()) {
            if !targets.contains(target) {
                targets.push(target.clone());
            }
        }
        targets
    }
}

/// One auto-saved version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub version_index: u64,
    pub file_name: String,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub saved_at: DateTime<Utc>,
    /// Explicit target written by the same save, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_target: Option<PathBuf>,
}

pub type ManifestFile = AtomicTomlFile<ArtifactManifest>;

/// Highest version index ever reserved for one logical path.
///
/// Written before any copy, so the index survives saves that only reached
/// an explicit target or the project directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexLedger {
    pub logical_path: String,
    pub last_index: u64,
}

impl IndexLedger {
    pub fn new(logical_path: impl Into<String>) -> Self {
        Self {
            logical_path: logical_path.into(),
            last_index: 0,
        }
    }
}

pub type IndexLedgerFile = AtomicTomlFile<IndexLedger>;

/// Records which version a copy outside the auto-save directory holds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionSidecar {
    pub logical_path: String,
    pub version_index: u64,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub saved_at: DateTime<Utc>,
}

/// `<dir>/<file>` → `<dir>/.<file>.version.toml`
pub fn sidecar_path(copy: &Path) -> PathBuf {
    let name = copy
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    copy.with_file_name(format!(".{}.version.toml", name))
}

pub fn load_sidecar(copy: &Path) -> Result<Option<VersionSidecar>, AtomicFileError> {
    AtomicTomlFile::<VersionSidecar>::new(sidecar_path(copy)).load()
}

pub fn save_sidecar(copy: &Path, sidecar: &VersionSidecar) -> Result<(), AtomicFileError> {
    AtomicTomlFile::<VersionSidecar>::new(sidecar_path(copy)).save(sidecar)
}
