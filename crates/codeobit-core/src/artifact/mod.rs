//! Artifact domain module.
//!
//! - `model`: artifact references, versions, save locations and outcomes
//! - `path`: logical path normalization and traversal protection

mod model;
mod path;

pub use model::{
    ArtifactKind, ArtifactRef, ArtifactVersion, ContentHash, LocationAttempt, LocationError,
    SaveLocation, SaveOutcome,
};
pub use path::{artifact_dir_name, logical_key, normalize_logical_path, sanitize_for_dir_name};
