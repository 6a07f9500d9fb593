//! TOML-backed project notebook storage.

use crate::storage::AtomicTomlFile;
use codeobit_core::Result;
use codeobit_core::project::{ProjectNotebook, ProjectRepository, notebook_path};
use std::path::Path;

/// Stores each notebook at `<root>/.codeobit/project.toml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlProjectRepository;

impl TomlProjectRepository {
    fn file(root: &Path) -> AtomicTomlFile<ProjectNotebook> {
        AtomicTomlFile::new(notebook_path(root))
    }
}

impl ProjectRepository for TomlProjectRepository {
    fn load(&self, root: &Path) -> Result<Option<ProjectNotebook>> {
        Ok(Self::file(root).load()?)
    }

    fn save(&self, root: &Path, notebook: &ProjectNotebook) -> Result<()> {
        Self::file(root).save(notebook)?;
        tracing::debug!(root = %root.display(), "Saved project notebook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_notebook() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlProjectRepository;
        assert!(repo.load(temp_dir.path()).unwrap().is_none());

        let mut notebook = ProjectNotebook::new("demo");
        notebook.add_requirement("login");
        notebook.add_note("remember caching");
        repo.save(temp_dir.path(), &notebook).unwrap();

        let loaded = repo.load(temp_dir.path()).unwrap().unwrap();
        assert_eq!(loaded, notebook);
        assert!(temp_dir.path().join(".codeobit/project.toml").exists());
    }
}
