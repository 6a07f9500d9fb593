//! Project notebook use cases: create, open, annotate and export.

use chrono::Utc;
use codeobit_core::artifact::{ArtifactKind, SaveOutcome};
use codeobit_core::project::{
    Note, ProjectNotebook, ProjectRepository, Requirement, WebResource, notebook_path,
};
use codeobit_core::session::ProjectRef;
use codeobit_core::{CodeobitError, Result};
use codeobit_infrastructure::{AutoSaveManager, SaveRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logical path of the exported notebook document.
pub const PROJECT_DOCUMENT: &str = "project.md";

struct OpenProject {
    root: PathBuf,
    notebook: ProjectNotebook,
}

/// Holds the open notebook and persists every change immediately.
pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    autosave: Arc<AutoSaveManager>,
    current: Option<OpenProject>,
}

impl ProjectService {
    pub fn new(repository: Arc<dyn ProjectRepository>, autosave: Arc<AutoSaveManager>) -> Self {
        Self {
            repository,
            autosave,
            current: None,
        }
    }

    pub fn active(&self) -> Option<(&Path, &ProjectNotebook)> {
        self.current
            .as_ref()
            .map(|open| (open.root.as_path(), &open.notebook))
    }

    pub fn project_ref(&self) -> Option<ProjectRef> {
        self.current
            .as_ref()
            .map(|open| ProjectRef::new(open.notebook.name.clone(), open.root.clone()))
    }

    /// Creates a notebook at `root`. Refuses to overwrite an existing one.
    pub fn create(&mut self, name: &str, root: &Path) -> Result<&ProjectNotebook> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CodeobitError::config("project name must not be empty"));
        }
        if self.repository.load(root)?.is_some() {
            return Err(CodeobitError::config(format!(
                "a project already exists at {}; use /project open",
                root.display()
            )));
        }

        let notebook = ProjectNotebook::new(name);
        self.repository.save(root, &notebook)?;
        tracing::info!(name, root = %root.display(), "Created project");
        Ok(self.set_current(root, notebook))
    }

    /// Opens the notebook stored under `root`.
    pub fn open(&mut self, root: &Path) -> Result<&ProjectNotebook> {
        let notebook = self
            .repository
            .load(root)?
            .ok_or_else(|| CodeobitError::not_found("Project", notebook_path(root).display().to_string()))?;
        tracing::info!(name = %notebook.name, root = %root.display(), "Opened project");
        Ok(self.set_current(root, notebook))
    }

    /// Opens the notebook under `root` if there is one; errors are logged.
    pub fn try_open(&mut self, root: &Path) -> bool {
        match self.open(root) {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "Could not open project");
                false
            }
        }
    }

    pub fn add_requirement(&mut self, description: &str) -> Result<Requirement> {
        self.update(|notebook| notebook.add_requirement(description).clone())
    }

    pub fn add_note(&mut self, content: &str) -> Result<Note> {
        self.update(|notebook| notebook.add_note(content).clone())
    }

    pub fn set_design(&mut self, section: &str, text: &str) -> Result<()> {
        self.update(|notebook| notebook.set_design(section, text))
    }

    pub fn record_web_resource(
        &mut self,
        url: &str,
        title: Option<String>,
        summary_artifact: &str,
    ) -> Result<()> {
        self.update(|notebook| {
            notebook.web_resources.push(WebResource {
                url: url.to_string(),
                title,
                summary_artifact: summary_artifact.to_string(),
                saved_at: Utc::now(),
            })
        })
    }

    /// Saves the notebook as a markdown document through the auto-save
    /// manager, optionally also to `target`.
    pub fn save_document(&self, target: Option<PathBuf>) -> Result<SaveOutcome> {
        let open = self.require_open()?;
        let request = SaveRequest::new(
            PROJECT_DOCUMENT,
            open.notebook.to_markdown(),
            ArtifactKind::Doc,
        )
        .with_target(target)
        .with_project_root(Some(open.root.clone()));
        self.autosave.save(&request)
    }

    fn update<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut ProjectNotebook) -> R,
    {
        let repository = Arc::clone(&self.repository);
        let open = self.require_open_mut()?;
        let mut notebook = open.notebook.clone();
        let result = f(&mut notebook);
        repository.save(&open.root, &notebook)?;
        open.notebook = notebook;
        Ok(result)
    }

    fn set_current(&mut self, root: &Path, notebook: ProjectNotebook) -> &ProjectNotebook {
        let open = self.current.insert(OpenProject {
            root: root.to_path_buf(),
            notebook,
        });
        &open.notebook
    }

    fn require_open(&self) -> Result<&OpenProject> {
        self.current.as_ref().ok_or_else(no_project)
    }

    fn require_open_mut(&mut self) -> Result<&mut OpenProject> {
        self.current.as_mut().ok_or_else(no_project)
    }
}

fn no_project() -> CodeobitError {
    CodeobitError::not_found("Project", "no active project (use /project new <name>)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeobit_core::ErrorKind;
    use codeobit_core::artifact::SaveLocation;
    use codeobit_infrastructure::TomlProjectRepository;
    use tempfile::TempDir;

    fn service(temp_dir: &TempDir) -> ProjectService {
        let autosave = Arc::new(AutoSaveManager::new(
            temp_dir.path().join(".codeobit/autosave"),
            temp_dir.path(),
        ));
        ProjectService::new(Arc::new(TomlProjectRepository), autosave)
    }

    #[test]
    fn test_create_then_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut projects = service(&temp_dir);
        projects.create("shop", temp_dir.path()).unwrap();
        projects.add_requirement("checkout").unwrap();
        projects.add_note("use stripe").unwrap();
        projects.set_design("architecture", "modular monolith").unwrap();

        let err = projects.create("again", temp_dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let mut reopened = service(&temp_dir);
        let notebook = reopened.open(temp_dir.path()).unwrap();
        assert_eq!(notebook.name, "shop");
        assert_eq!(notebook.requirements.len(), 1);
        assert_eq!(notebook.notes[0].content, "use stripe");
        assert_eq!(
            notebook.design.get("architecture").map(String::as_str),
            Some("modular monolith")
        );
    }

    #[test]
    fn test_operations_require_open_project() {
        let temp_dir = TempDir::new().unwrap();
        let mut projects = service(&temp_dir);
        assert!(projects.add_note("x").unwrap_err().is_not_found());
        assert!(projects.set_design("api", "x").unwrap_err().is_not_found());
        assert!(projects.save_document(None).unwrap_err().is_not_found());
        assert!(!projects.try_open(temp_dir.path()));
        assert!(projects.open(temp_dir.path()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_save_document_versions_markdown() {
        let temp_dir = TempDir::new().unwrap();
        let mut projects = service(&temp_dir);
        projects.create("shop", temp_dir.path()).unwrap();

        let first = projects.save_document(None).unwrap();
        assert_eq!(first.version_index, 1);
        assert_eq!(first.succeeded_at, Some(SaveLocation::AutoSaveDir));

        let target = temp_dir.path().join("exports/shop.md");
        let second = projects.save_document(Some(target.clone())).unwrap();
        assert_eq!(second.version_index, 2);
        assert_eq!(second.saved_to_target(), Some(true));
        assert!(std::fs::read_to_string(target).unwrap().starts_with("# shop"));
    }
}
