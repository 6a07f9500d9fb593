use codeobit_core::fs::FileLookup;
use std::path::{Path, PathBuf};

/// [`FileLookup`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileLookup;

impl FileLookup for OsFileLookup {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut children: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        children.sort();
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_sorted_children() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("b")).unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "x").unwrap();

        let lookup = OsFileLookup;
        assert_eq!(
            lookup.list_dir(temp_dir.path()),
            vec![temp_dir.path().join("a.txt"), temp_dir.path().join("b")]
        );
        assert!(lookup.is_dir(&temp_dir.path().join("b")));
        assert!(lookup.list_dir(&temp_dir.path().join("a.txt")).is_empty());
    }
}
