//! Project notebook: requirements, design, notes and saved web resources.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory inside a project root holding codeobit metadata.
pub const PROJECT_META_DIR: &str = ".codeobit";
pub const PROJECT_FILE: &str = "project.toml";

/// `<root>/.codeobit/project.toml`
pub fn notebook_path(root: &Path) -> PathBuf {
    root.join(PROJECT_META_DIR).join(PROJECT_FILE)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequirementStatus {
    #[default]
    Pending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub description: String,
    #[serde(default)]
    pub status: RequirementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A page summarized through `/browse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Logical path of the saved summary artifact
    pub summary_artifact: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNotebook {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Design decisions keyed by section name (`architecture`, `api`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub design: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub web_resources: Vec<WebResource>,
}

impl ProjectNotebook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            requirements: Vec::new(),
            design: BTreeMap::new(),
            notes: Vec::new(),
            web_resources: Vec::new(),
        }
    }

    pub fn add_requirement(&mut self, description: impl Into<String>) -> &Requirement {
        self.requirements.push(Requirement {
            description: description.into(),
            status: RequirementStatus::Pending,
            created_at: Utc::now(),
        });
        &self.requirements[self.requirements.len() - 1]
    }

    pub fn add_note(&mut self, content: impl Into<String>) -> &Note {
        self.notes.push(Note {
            content: content.into(),
            created_at: Utc::now(),
        });
        &self.notes[self.notes.len() - 1]
    }

    /// Replaces the text of one design section. Section names are
    /// case-insensitive.
    pub fn set_design(&mut self, section: &str, text: impl Into<String>) {
        self.design
            .insert(section.trim().to_lowercase(), text.into());
    }

    /// Renders the notebook as a markdown document.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# {}\n\nCreated: {}\n",
            self.name,
            self.created_at.format("%Y-%m-%d %H:%M UTC")
        );

        out.push_str("\n## Requirements\n\n");
        if self.requirements.is_empty() {
            out.push_str("_None yet._\n");
        }
        for (i, req) in self.requirements.iter().enumerate() {
            out.push_str(&format!("{}. [{}] {}\n", i + 1, req.status, req.description));
        }

        if !self.design.is_empty() {
            out.push_str("\n## Design\n");
            for (section, text) in &self.design {
                out.push_str(&format!("\n### {}\n\n{}\n", section, text.trim_end()));
            }
        }

        out.push_str("\n## Notes\n\n");
        if self.notes.is_empty() {
            out.push_str("_None yet._\n");
        }
        for note in &self.notes {
            out.push_str(&format!("- {}\n", note.content));
        }

        if !self.web_resources.is_empty() {
            out.push_str("\n## Web resources\n\n");
            for resource in &self.web_resources {
                let title = resource.title.as_deref().unwrap_or(&resource.url);
                out.push_str(&format!(
                    "- [{}]({}) (summary: `{}`)\n",
                    title, resource.url, resource.summary_artifact
                ));
            }
        }

        out
    }
}

/// Persistence of notebooks keyed by project root.
pub trait ProjectRepository: Send + Sync {
    fn load(&self, root: &Path) -> Result<Option<ProjectNotebook>>;
    fn save(&self, root: &Path, notebook: &ProjectNotebook) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_rendering() {
        let mut notebook = ProjectNotebook::new("shop");
        notebook.add_requirement("users can check out");
        notebook.add_note("prefer postgres");

        let md = notebook.to_markdown();
        assert!(md.starts_with("# shop\n"));
        assert!(md.contains("1. [pending] users can check out"));
        assert!(md.contains("- prefer postgres"));
        assert!(!md.contains("Web resources"));
        assert!(!md.contains("## Design"));
    }

    #[test]
    fn test_design_sections_render_between_requirements_and_notes() {
        let mut notebook = ProjectNotebook::new("shop");
        notebook.set_design("API", "REST over HTTPS");
        notebook.set_design("architecture", "hexagonal");
        notebook.set_design("api", "gRPC");

        assert_eq!(notebook.design.len(), 2);
        let md = notebook.to_markdown();
        let design = md.find("## Design").unwrap();
        assert!(md.find("## Requirements").unwrap() < design);
        assert!(design < md.find("## Notes").unwrap());
        assert!(md.contains("### api\n\ngRPC\n"));
        assert!(md.find("### api").unwrap() < md.find("### architecture").unwrap());
    }

    #[test]
    fn test_notebook_path() {
        assert_eq!(
            notebook_path(Path::new("/p")),
            PathBuf::from("/p/.codeobit/project.toml")
        );
    }
}
