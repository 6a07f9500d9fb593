//! Logical path handling shared by every storage location.

use super::model::ContentHash;
use crate::error::{CodeobitError, Result};
use std::path::{Component, Path, PathBuf};

/// Hex digits of the logical path hash appended to directory names.
const DIR_HASH_LEN: usize = 8;

/// Lexically normalizes a logical path relative to a storage root.
///
/// `.` segments are dropped and `..` segments pop the previous segment.
/// Absolute paths, empty paths and any `..` that would climb above the root
/// are rejected with [`CodeobitError::PathTraversal`]. Backslashes are treated
/// as separators on every platform.
pub fn normalize_logical_path(logical_path: &str) -> Result<PathBuf> {
    let unified = logical_path.trim().replace('\\', "/");
    let mut parts = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(CodeobitError::path_traversal(logical_path));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(CodeobitError::path_traversal(logical_path));
            }
        }
    }

    if parts.is_empty() {
        return Err(CodeobitError::path_traversal(logical_path));
    }

    Ok(parts.iter().collect())
}

/// Flattens a normalized logical path into a single directory name.
///
/// Separators become `__`; characters outside `[A-Za-z0-9._-]` become `_`.
pub fn sanitize_for_dir_name(normalized: &Path) -> String {
    normalized
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .map(|segment| {
            segment
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("__")
}

/// Canonical `/`-separated form of a normalized logical path.
pub fn logical_key(normalized: &Path) -> String {
    normalized
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory name holding the versions of one logical path.
///
/// The sanitized form keeps the name readable; the hash suffix keeps paths
/// that sanitize alike (`my notes.md`, `my_notes.md`) apart.
pub fn artifact_dir_name(normalized: &Path) -> String {
    let hash = ContentHash::of(logical_key(normalized).as_bytes());
    let suffix = hash.as_str().get(..DIR_HASH_LEN).unwrap_or(hash.as_str());
    format!("{}-{}", sanitize_for_dir_name(normalized), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_normalize_plain_paths() {
        assert_eq!(
            normalize_logical_path("src/app.py").unwrap(),
            PathBuf::from("src/app.py")
        );
        assert_eq!(
            normalize_logical_path("./docs/../report.md").unwrap(),
            PathBuf::from("report.md")
        );
        assert_eq!(
            normalize_logical_path("a\\b.txt").unwrap(),
            PathBuf::from("a/b.txt")
        );
    }

    #[test]
    fn test_traversal_is_rejected() {
        for input in [
            "../../etc/passwd",
            "..",
            "a/../../b",
            "/etc/passwd",
            "..\\..\\secret",
            "",
            ".",
        ] {
            let err = normalize_logical_path(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathTraversal, "input: {input:?}");
        }
    }

    #[test]
    fn test_sanitize_for_dir_name() {
        let normalized = normalize_logical_path("src/my app/main.rs").unwrap();
        assert_eq!(sanitize_for_dir_name(&normalized), "src__my_app__main.rs");
        assert_eq!(
            sanitize_for_dir_name(Path::new("report.md")),
            "report.md"
        );
    }

    #[test]
    fn test_artifact_dir_name_is_distinct_for_colliding_paths() {
        let spaced = artifact_dir_name(Path::new("my notes.md"));
        let underscored = artifact_dir_name(Path::new("my_notes.md"));

        assert!(spaced.starts_with("my_notes.md-"));
        assert!(underscored.starts_with("my_notes.md-"));
        assert_ne!(spaced, underscored);
        assert_eq!(spaced.len(), "my_notes.md-".len() + DIR_HASH_LEN);

        let nested = normalize_logical_path("src\\my app/main.rs").unwrap();
        assert_eq!(logical_key(&nested), "src/my app/main.rs");
        assert_eq!(
            artifact_dir_name(&nested),
            artifact_dir_name(Path::new("src/my app/main.rs"))
        );
    }
}
