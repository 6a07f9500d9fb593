//! Filesystem capability used by file-reference resolution.
//!
//! The router never touches the disk directly, so tests can run against
//! [`InMemoryFileLookup`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Minimal read-only filesystem view.
pub trait FileLookup: Send + Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Direct children of `path`. Empty when `path` is not a directory.
    fn list_dir(&self, path: &Path) -> Vec<PathBuf>;
}

/// A [`FileLookup`] over a fixed set of file paths.
///
/// Every ancestor of an inserted file is treated as a directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileLookup {
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl InMemoryFileLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut lookup = Self::new();
        for file in files {
            lookup.add_file(file);
        }
        lookup
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        self.files.insert(path);
    }
}

impl FileLookup for InMemoryFileLookup {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains(path) || self.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .chain(self.dirs.iter())
            .filter(|candidate| candidate.parent() == Some(path))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
