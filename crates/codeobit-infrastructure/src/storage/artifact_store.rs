//! Durable byte storage for artifacts under a single root directory.

use super::atomic_file::{AtomicFileError, write_atomic, write_new_atomic};
use codeobit_core::artifact::normalize_logical_path;
use codeobit_core::{CodeobitError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores named content beneath `root`.
///
/// Every logical path is normalized and must stay inside the root. Writes are
/// atomic (tmp file + rename). There is no locking beyond the rename itself.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path for `logical_path`, or `PathTraversal`.
    pub fn resolve(&self, logical_path: &str) -> Result<PathBuf> {
        Ok(self.root.join(normalize_logical_path(logical_path)?))
    }

    /// Atomically writes `content`, creating intermediate directories.
    pub fn write(&self, logical_path: &str, content: &[u8]) -> Result<PathBuf> {
        let physical = self.resolve(logical_path)?;

        if let Some(parent) = physical.parent() {
            fs::create_dir_all(parent)?;
            self.ensure_inside_root(logical_path, parent)?;
        }

        write_atomic(&physical, content)?;
        tracing::debug!(path = %physical.display(), bytes = content.len(), "Wrote artifact file");
        Ok(physical)
    }

    /// Writes `content` only if nothing exists at `logical_path` yet.
    ///
    /// Fails with an `Io` error naming the existing file otherwise.
    pub fn write_new(&self, logical_path: &str, content: &[u8]) -> Result<PathBuf> {
        let physical = self.resolve(logical_path)?;

        if let Some(parent) = physical.parent() {
            fs::create_dir_all(parent)?;
            self.ensure_inside_root(logical_path, parent)?;
        }

        match write_new_atomic(&physical, content) {
            Ok(()) => {
                tracing::debug!(path = %physical.display(), bytes = content.len(), "Wrote new artifact file");
                Ok(physical)
            }
            Err(AtomicFileError::IoError(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CodeobitError::io(format!(
                    "refusing to overwrite existing '{}'",
                    physical.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read(&self, logical_path: &str) -> Result<Vec<u8>> {
        let physical = self.resolve(logical_path)?;
        match fs::read(&physical) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CodeobitError::not_found("artifact file", logical_path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_to_string(&self, logical_path: &str) -> Result<String> {
        let bytes = self.read(logical_path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// `false` for missing files and for paths that would escape the root.
    pub fn exists(&self, logical_path: &str) -> bool {
        self.resolve(logical_path)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Rejects writes whose parent resolves (through symlinks) outside the root.
    fn ensure_inside_root(&self, logical_path: &str, parent: &Path) -> Result<()> {
        let root = fs::canonicalize(&self.root)?;
        let parent = fs::canonicalize(parent)?;
        if parent.starts_with(&root) {
            Ok(())
        } else {
            Err(CodeobitError::path_traversal(logical_path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeobit_core::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path());

        let physical = store.write("docs/report.md", b"hello").unwrap();
        assert_eq!(physical, temp_dir.path().join("docs/report.md"));
        assert!(store.exists("docs/report.md"));
        assert_eq!(store.read_to_string("docs/report.md").unwrap(), "hello");

        store.write("docs/report.md", b"again").unwrap();
        assert_eq!(store.read("docs/report.md").unwrap(), b"again");
    }

    #[test]
    fn test_write_new_keeps_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path());

        store.write_new("hist/v000001.auto", b"ORIGINAL").unwrap();
        let err = store.write_new("hist/v000001.auto", b"other").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.read_to_string("hist/v000001.auto").unwrap(), "ORIGINAL");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp_dir.path());

        assert!(!store.exists("nope.txt"));
        assert_eq!(store.read("nope.txt").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_traversal_always_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");
        for root in [temp_dir.path().to_path_buf(), nested] {
            let store = FsArtifactStore::new(&root);
            for input in ["../../etc/passwd", "../escape.txt", "/etc/passwd", "x/../../y"] {
                let err = store.write(input, b"x").unwrap_err();
                assert_eq!(err.kind(), ErrorKind::PathTraversal, "input {input:?}");
                assert!(!store.exists(input));
            }
        }
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        let store = FsArtifactStore::new(&root);
        let err = store.write("link/owned.txt", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
        assert!(!outside.path().join("owned.txt").exists());
    }
}
