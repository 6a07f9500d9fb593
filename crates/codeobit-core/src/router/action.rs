//! Routed actions.
//!
//! `Action` is a closed set: every line of input maps to exactly one variant
//! and the dispatcher matches on it exhaustively.

use super::intent::Intent;
use crate::artifact::ArtifactKind;
use crate::error::CodeobitError;
use crate::session::Theme;
use std::path::PathBuf;

/// The result of routing one line of input.
#[derive(Debug, Clone)]
pub enum Action {
    /// A `/command`, parsed or carrying the reason it could not be parsed
    SlashCommand(SlashCommand),
    /// Free text destined for the AI collaborator
    NaturalLanguageRequest(NaturalLanguageRequest),
    /// Exact provider shortcut (`!gpt`, `use provider claude`)
    ProviderSwitch { provider_id: String },
    Exit,
}

/// A tokenized slash command.
#[derive(Debug, Clone)]
pub struct SlashCommand {
    /// Name as typed, without the leading `/`
    pub name: String,
    pub args: Vec<String>,
    /// `UnknownCommand` or `Arg` on failure
    pub parsed: Result<Command, CodeobitError>,
}

impl SlashCommand {
    pub fn is_ok(&self) -> bool {
        self.parsed.is_ok()
    }
}

/// Builtin commands with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help { topic: Option<String> },
    Quickstart,
    Status,
    History,
    Clear,
    /// `None` shows the current theme
    Theme { theme: Option<Theme> },
    Provider(ProviderCommand),
    Project(ProjectCommand),
    Generate(GenerateRequest),
    Browse { url: String },
    Versions { logical_path: String },
    Recover {
        logical_path: String,
        version: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    List,
    Set { provider_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectCommand {
    Status,
    Help,
    New { name: String },
    Open { path: PathBuf },
    /// `add: None` lists the current entries
    Requirements { add: Option<String> },
    /// `set: None` lists the design sections
    Design { set: Option<DesignEntry> },
    Notes { add: Option<String> },
    Save { target: Option<PathBuf> },
}

/// `/project design set <section> <text>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignEntry {
    pub section: String,
    pub text: String,
}

/// Which generation flavour a command asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GenerateOperation {
    Generate,
    Analyze,
    Test,
    Docs,
}

impl GenerateOperation {
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            GenerateOperation::Generate => ArtifactKind::Code,
            GenerateOperation::Analyze => ArtifactKind::Report,
            GenerateOperation::Test => ArtifactKind::Test,
            GenerateOperation::Docs => ArtifactKind::Doc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub operation: GenerateOperation,
    pub prompt: String,
    /// Explicit output path (`--out`)
    pub output: Option<PathBuf>,
}

/// An `@path` token found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// The path text without the `@`
    pub token: String,
    pub resolved: Option<PathBuf>,
}

impl FileReference {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Free text plus everything the router could work out about it.
#[derive(Debug, Clone)]
pub struct NaturalLanguageRequest {
    /// Original input; unresolved references stay as literal `@token` text
    pub text: String,
    pub references: Vec<FileReference>,
    pub intent: Intent,
}

impl NaturalLanguageRequest {
    pub fn unresolved(&self) -> impl Iterator<Item = &FileReference> {
        self.references.iter().filter(|r| !r.is_resolved())
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&FileReference, &PathBuf)> {
        self.references
            .iter()
            .filter_map(|r| r.resolved.as_ref().map(|path| (r, path)))
    }
}
