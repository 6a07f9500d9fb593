//! Executes routed actions against the session, the AI collaborator and the
//! auto-save manager.

use crate::file_context::render_references;
use crate::project_service::ProjectService;
use crate::prompts;
use crate::result::{InteractionResult, Notice};
use codeobit_core::ai::{AiCompleter, WebFetcher};
use codeobit_core::artifact::{ArtifactKind, ArtifactRef, SaveOutcome, normalize_logical_path};
use codeobit_core::router::{
    Action, Command, CommandRouter, DesignEntry, GenerateRequest, NaturalLanguageRequest,
    ProjectCommand, ProviderCommand, SlashCommand, builtin_commands, find_builtin_command,
};
use codeobit_core::session::{ConversationTurn, SessionContext, TurnRole};
use codeobit_core::{CodeobitError, Result};
use codeobit_infrastructure::{AutoSaveManager, SaveRequest};
use codeobit_interaction::web_fetcher::normalize_url;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The single owner of session state; one call per input line.
pub struct InteractionService {
    router: CommandRouter,
    session: SessionContext,
    completer: Arc<dyn AiCompleter>,
    fetcher: Arc<dyn WebFetcher>,
    autosave: Arc<AutoSaveManager>,
    projects: ProjectService,
    summary_max_chars: usize,
}

impl InteractionService {
    pub fn new(
        router: CommandRouter,
        session: SessionContext,
        completer: Arc<dyn AiCompleter>,
        fetcher: Arc<dyn WebFetcher>,
        autosave: Arc<AutoSaveManager>,
        projects: ProjectService,
        summary_max_chars: usize,
    ) -> Self {
        Self {
            router,
            session,
            completer,
            fetcher,
            autosave,
            projects,
            summary_max_chars,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn autosave(&self) -> &Arc<AutoSaveManager> {
        &self.autosave
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    /// Opens the notebook under `root`, if any, and makes it the session's
    /// active project.
    pub fn open_project_if_present(&mut self, root: &Path) -> bool {
        let opened = self.projects.try_open(root);
        if opened {
            self.session.set_active_project(self.projects.project_ref());
        }
        opened
    }

    /// Routes and executes one line of input.
    pub async fn handle_line(&mut self, line: &str) -> InteractionResult {
        if line.trim().is_empty() {
            return InteractionResult::NoOp;
        }

        match self.router.route(line, &mut self.session) {
            Action::Exit => InteractionResult::Exit,
            Action::ProviderSwitch { provider_id } => self.switch_provider(&provider_id),
            Action::SlashCommand(command) => self.slash_command(command).await,
            Action::NaturalLanguageRequest(request) => self.natural_language(request).await,
        }
    }

    // ============================================================================
    // Slash commands
    // ============================================================================

    async fn slash_command(&mut self, command: SlashCommand) -> InteractionResult {
        let parsed = match command.parsed {
            Ok(parsed) => parsed,
            Err(err) => return error_result(&err, Vec::new()),
        };

        match parsed {
            Command::Help { topic } => help(topic.as_deref()),
            Command::Quickstart => {
                InteractionResult::Notices(QUICKSTART.iter().map(|l| Notice::info(*l)).collect())
            }
            Command::Status => InteractionResult::Notices(self.status()),
            Command::History => self.history(),
            Command::Clear => {
                self.session.clear_history();
                InteractionResult::Cleared
            }
            Command::Theme { theme: None } => InteractionResult::notice(Notice::info(format!(
                "Theme: {}",
                self.session.theme()
            ))),
            Command::Theme { theme: Some(theme) } => {
                self.session.set_theme(theme);
                InteractionResult::notice(Notice::success(format!("Theme set to {theme}")))
            }
            Command::Provider(ProviderCommand::List) => self.list_providers(),
            Command::Provider(ProviderCommand::Set { provider_id }) => {
                self.switch_provider(&provider_id)
            }
            Command::Project(project) => self.project_command(project),
            Command::Generate(request) => self.generate(request).await,
            Command::Browse { url } => self.browse(&url).await,
            Command::Versions { logical_path } => self.versions(&logical_path),
            Command::Recover {
                logical_path,
                version,
            } => self.recover(&logical_path, version),
        }
    }

    fn switch_provider(&mut self, provider_id: &str) -> InteractionResult {
        match self.session.set_provider(provider_id) {
            Ok(provider) => {
                InteractionResult::notice(Notice::success(format!("Switched to {provider}")))
            }
            Err(err) => error_result(&err, Vec::new()),
        }
    }

    fn list_providers(&self) -> InteractionResult {
        let active = self.session.active_provider();
        let notices = self
            .session
            .registry()
            .enabled()
            .iter()
            .map(|provider| {
                if *provider == active {
                    Notice::success(format!("* {provider} (active)"))
                } else {
                    Notice::info(format!("  {provider}"))
                }
            })
            .collect();
        InteractionResult::Notices(notices)
    }

    fn status(&self) -> Vec<Notice> {
        let mut notices = vec![Notice::info(format!(
            "Provider: {}",
            self.session.active_provider()
        ))];

        notices.push(Notice::info(match self.session.active_project() {
            Some(project) => format!("Project: {} ({})", project.name, project.root.display()),
            None => "Project: none".to_string(),
        }));
        notices.push(Notice::info(format!(
            "History: {}/{} turns",
            self.session.len(),
            self.session.max_turns()
        )));
        let usage = self.session.usage();
        notices.push(Notice::info(format!(
            "Token usage: ~{} (~{} in, ~{} out over {} request(s))",
            usage.total(),
            usage.input_tokens,
            usage.output_tokens,
            usage.requests
        )));

        let pending = self.autosave.pending_paths();
        if pending.is_empty() {
            notices.push(Notice::info("Pending auto-saves: none"));
        } else {
            notices.push(Notice::warning(format!(
                "Pending auto-saves: {} ({})",
                pending.len(),
                pending.join(", ")
            )));
        }
        notices.push(Notice::info(format!(
            "Auto-save directory: {}",
            self.autosave.autosave_root().display()
        )));
        notices.push(Notice::info(format!("Theme: {}", self.session.theme())));
        notices
    }

    fn history(&self) -> InteractionResult {
        let notices: Vec<Notice> = self
            .session
            .turns()
            .map(|turn| {
                let line = format!(
                    "[{}] {}",
                    turn.timestamp().format("%H:%M:%S"),
                    turn.render().trim_end()
                );
                match turn.role() {
                    TurnRole::User => Notice::info(line),
                    TurnRole::Assistant => Notice::success(line),
                    TurnRole::System => Notice::warning(line),
                }
            })
            .collect();
        InteractionResult::Notices(notices)
    }

    // ============================================================================
    // Project notebook
    // ============================================================================

    fn project_command(&mut self, command: ProjectCommand) -> InteractionResult {
        match self.run_project_command(command) {
            Ok(notices) => InteractionResult::Notices(notices),
            Err(err) => error_result(&err, Vec::new()),
        }
    }

    fn run_project_command(&mut self, command: ProjectCommand) -> Result<Vec<Notice>> {
        match command {
            ProjectCommand::Help => Ok(PROJECT_HELP.iter().map(|l| Notice::info(*l)).collect()),
            ProjectCommand::Status => Ok(self.project_status()),
            ProjectCommand::New { name } => {
                let root = self.router.cwd().to_path_buf();
                self.projects.create(&name, &root)?;
                self.session.set_active_project(self.projects.project_ref());
                Ok(vec![Notice::success(format!(
                    "Created project '{name}' in {}",
                    root.display()
                ))])
            }
            ProjectCommand::Open { path } => {
                let root = self.resolve_against_cwd(&path);
                let name = self.projects.open(&root)?.name.clone();
                self.session.set_active_project(self.projects.project_ref());
                Ok(vec![Notice::success(format!(
                    "Opened project '{name}' ({})",
                    root.display()
                ))])
            }
            ProjectCommand::Requirements { add: Some(text) } => {
                self.projects.add_requirement(&text)?;
                Ok(vec![Notice::success(format!("Added requirement: {text}"))])
            }
            ProjectCommand::Requirements { add: None } => {
                let notebook = self.require_notebook()?;
                if notebook.requirements.is_empty() {
                    return Ok(vec![Notice::info("No requirements yet")]);
                }
                Ok(notebook
                    .requirements
                    .iter()
                    .enumerate()
                    .map(|(i, req)| {
                        Notice::info(format!("{}. [{}] {}", i + 1, req.status, req.description))
                    })
                    .collect())
            }
            ProjectCommand::Design {
                set: Some(DesignEntry { section, text }),
            } => {
                self.projects.set_design(&section, &text)?;
                Ok(vec![Notice::success(format!("Updated design section '{section}'"))])
            }
            ProjectCommand::Design { set: None } => {
                let notebook = self.require_notebook()?;
                if notebook.design.is_empty() {
                    return Ok(vec![Notice::info(
                        "No design yet. Use /project design set <section> <text>",
                    )]);
                }
                Ok(notebook
                    .design
                    .iter()
                    .map(|(section, text)| Notice::info(format!("{section}: {text}")))
                    .collect())
            }
            ProjectCommand::Notes { add: Some(text) } => {
                self.projects.add_note(&text)?;
                Ok(vec![Notice::success("Note added")])
            }
            ProjectCommand::Notes { add: None } => {
                let notebook = self.require_notebook()?;
                if notebook.notes.is_empty() {
                    return Ok(vec![Notice::info("No notes yet")]);
                }
                Ok(notebook
                    .notes
                    .iter()
                    .map(|note| {
                        Notice::info(format!(
                            "- {} ({})",
                            note.content,
                            note.created_at.format("%Y-%m-%d")
                        ))
                    })
                    .collect())
            }
            ProjectCommand::Save { target } => {
                let target = target.map(|t| self.resolve_against_project(&t));
                let outcome = self.projects.save_document(target)?;
                Ok(describe_outcome(&outcome))
            }
        }
    }

    fn project_status(&self) -> Vec<Notice> {
        let Some((root, notebook)) = self.projects.active() else {
            return vec![Notice::info(
                "No active project. Use /project new <name> or /project open <dir>",
            )];
        };
        vec![
            Notice::info(format!("Project: {} ({})", notebook.name, root.display())),
            Notice::info(format!(
                "Created: {}",
                notebook.created_at.format("%Y-%m-%d %H:%M UTC")
            )),
            Notice::info(format!("Requirements: {}", notebook.requirements.len())),
            Notice::info(format!("Design sections: {}", notebook.design.len())),
            Notice::info(format!("Notes: {}", notebook.notes.len())),
            Notice::info(format!("Web resources: {}", notebook.web_resources.len())),
        ]
    }

    fn require_notebook(&self) -> Result<&codeobit_core::project::ProjectNotebook> {
        self.projects.active().map(|(_, notebook)| notebook).ok_or_else(|| {
            CodeobitError::not_found("Project", "no active project (use /project new <name>)")
        })
    }

    // ============================================================================
    // AI requests
    // ============================================================================

    async fn natural_language(&mut self, request: NaturalLanguageRequest) -> InteractionResult {
        let mut notices: Vec<Notice> = request
            .unresolved()
            .map(|reference| {
                Notice::warning(format!(
                    "Could not find @{}; sending it as plain text",
                    reference.token
                ))
            })
            .collect();

        let references = render_references(
            request
                .resolved()
                .map(|(reference, path)| (reference.token.as_str(), path.as_path())),
        );
        let prompt = prompts::compose(
            prompts::intent_instruction(request.intent),
            &request.text,
            &references,
        );

        let provider = self.session.active_provider();
        let context = self.session.summary_for_prompt(self.summary_max_chars);
        let response = match self.completer.complete(&prompt, &context, provider).await {
            Ok(response) => response,
            Err(err) => return error_result(&err, notices),
        };
        self.session.record_usage(&format!("{context}\n{prompt}"), &response);

        let mut artifacts = Vec::new();
        if let Some(kind) = request.intent.artifact_kind() {
            let logical_path = prompts::artifact_name(kind, &request.text, &response);
            let content = prompts::artifact_content(kind, &response);
            match self.queue_artifact(&logical_path, content, kind) {
                Ok(artifact) => {
                    notices.push(Notice::info(format!(
                        "Queued {logical_path} for auto-save"
                    )));
                    artifacts.push(artifact);
                }
                Err(err) => notices.push(Notice::error(err.to_string())),
            }
        }

        self.session
            .append_turn(ConversationTurn::assistant(response.clone(), artifacts));
        InteractionResult::AiResponse {
            provider,
            text: response,
            notices,
        }
    }

    async fn generate(&mut self, request: GenerateRequest) -> InteractionResult {
        let prompt = prompts::compose(
            prompts::operation_instruction(request.operation),
            &request.prompt,
            "",
        );
        let provider = self.session.active_provider();
        let context = self.session.summary_for_prompt(self.summary_max_chars);
        let response = match self.completer.complete(&prompt, &context, provider).await {
            Ok(response) => response,
            Err(err) => return error_result(&err, Vec::new()),
        };
        self.session.record_usage(&format!("{context}\n{prompt}"), &response);

        let kind = request.operation.artifact_kind();
        let content = prompts::artifact_content(kind, &response);
        let mut notices = Vec::new();
        let mut artifacts = Vec::new();

        match request.output {
            Some(output) => {
                let logical_path = output_logical_path(&output)
                    .unwrap_or_else(|| prompts::artifact_name(kind, &request.prompt, &response));
                let save = SaveRequest::new(logical_path.as_str(), content, kind)
                    .with_target(Some(self.resolve_against_project(&output)))
                    .with_project_root(self.project_root());
                match self.autosave.save(&save) {
                    Ok(outcome) => {
                        notices.extend(describe_outcome(&outcome));
                        artifacts.push(ArtifactRef::new(outcome.logical_path, kind));
                    }
                    Err(err) => notices.extend(error_notices(&err)),
                }
            }
            None => {
                let logical_path = prompts::artifact_name(kind, &request.prompt, &response);
                match self.queue_artifact(&logical_path, content, kind) {
                    Ok(artifact) => {
                        notices.push(Notice::info(format!(
                            "Queued {logical_path} for auto-save"
                        )));
                        artifacts.push(artifact);
                    }
                    Err(err) => notices.extend(error_notices(&err)),
                }
            }
        }

        self.session
            .append_turn(ConversationTurn::assistant(response.clone(), artifacts));
        InteractionResult::AiResponse {
            provider,
            text: response,
            notices,
        }
    }

    async fn browse(&mut self, url: &str) -> InteractionResult {
        let url = match normalize_url(url) {
            Ok(url) => url,
            Err(err) => return error_result(&err, Vec::new()),
        };
        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(err) => return error_result(&err, Vec::new()),
        };

        let mut notices = Vec::new();
        if page.text.is_empty() {
            notices.push(Notice::warning("The page has no readable text"));
        }

        let provider = self.session.active_provider();
        let prompt = prompts::browse_summary_prompt(&page.url, page.title.as_deref(), &page.text);
        let summary = match self.completer.complete(&prompt, "", provider).await {
            Ok(summary) => summary,
            Err(err) => return error_result(&err, notices),
        };
        self.session.record_usage(&prompt, &summary);

        let title = page.title.clone().unwrap_or_else(|| page.url.clone());
        let logical_path = prompts::web_summary_name(&page.url);
        let document = format!("# {title}\n\nSource: {}\n\n{summary}\n", page.url);

        let mut artifacts = Vec::new();
        match self.queue_artifact(&logical_path, document, ArtifactKind::Report) {
            Ok(artifact) => {
                notices.push(Notice::info(format!(
                    "Queued {logical_path} for auto-save"
                )));
                artifacts.push(artifact);
            }
            Err(err) => notices.extend(error_notices(&err)),
        }

        if self.projects.active().is_some() {
            match self
                .projects
                .record_web_resource(&page.url, page.title.clone(), &logical_path)
            {
                Ok(()) => notices.push(Notice::success("Added to project web resources")),
                Err(err) => notices.extend(error_notices(&err)),
            }
        }

        self.session
            .append_turn(ConversationTurn::assistant(summary.clone(), artifacts));
        InteractionResult::AiResponse {
            provider,
            text: summary,
            notices,
        }
    }

    // ============================================================================
    // Versions
    // ============================================================================

    fn versions(&self, logical_path: &str) -> InteractionResult {
        let entries = match self.autosave.history(logical_path) {
            Ok(entries) => entries,
            Err(err) => return error_result(&err, Vec::new()),
        };
        let notices = entries
            .iter()
            .map(|entry| {
                let mut line = format!(
                    "v{}  {}  {} bytes  {}",
                    entry.version_index,
                    entry.saved_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.size_bytes,
                    entry.content_hash.short()
                );
                if let Some(target) = &entry.explicit_target {
                    line.push_str(&format!("  -> {}", target.display()));
                }
                Notice::info(line)
            })
            .collect();
        InteractionResult::Notices(notices)
    }

    fn recover(&self, logical_path: &str, version: Option<u64>) -> InteractionResult {
        let project_root = self.project_root();
        let recovered = match version {
            Some(version) => {
                self.autosave
                    .recover_version(logical_path, version, project_root.as_deref())
            }
            None => self.autosave.recover(logical_path, project_root.as_deref()),
        };
        match recovered {
            Ok(version) => InteractionResult::Notices(vec![
                Notice::success(format!(
                    "Recovered {} v{} from {} ({} bytes)",
                    version.artifact_ref.logical_path(),
                    version.version_index,
                    version.save_location,
                    version.size_bytes
                )),
                Notice::info(version.content),
            ]),
            Err(err) => error_result(&err, Vec::new()),
        }
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    fn queue_artifact(
        &self,
        logical_path: &str,
        content: String,
        kind: ArtifactKind,
    ) -> Result<ArtifactRef> {
        let request =
            SaveRequest::new(logical_path, content, kind).with_project_root(self.project_root());
        self.autosave.mark_dirty(request)?;
        Ok(ArtifactRef::new(logical_path, kind))
    }

    fn project_root(&self) -> Option<PathBuf> {
        self.session
            .active_project()
            .map(|project| project.root.clone())
    }

    fn resolve_against_cwd(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.router.cwd().join(path)
        }
    }

    /// Relative output paths land in the project root, or the launch
    /// directory without a project.
    fn resolve_against_project(&self, path: &Path) -> PathBuf {
        match self.project_root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => self.resolve_against_cwd(path),
        }
    }
}

const PROJECT_HELP: &[&str] = &[
    "/project status                  Show the active project",
    "/project new <name>              Create a project in the current directory",
    "/project open <dir>              Open the project stored in <dir>",
    "/project requirements [add <t>]  List or add requirements",
    "/project design [set <s> <t>]    List design sections or replace one",
    "/project notes [add <t>]         List or add notes",
    "/project save [--to <path>]      Save the notebook as markdown",
];

const QUICKSTART: &[&str] = &[
    "Quick start",
    "  1. Ask in plain language:        write a function that parses ISO dates",
    "  2. Point at files with @path:    explain @src/main.rs",
    "  3. Generate into a file:         /generate a CLI parser --out src/cli.rs",
    "  4. Switch providers:             !claude  or  /provider set gpt",
    "  5. Keep a notebook:              /project new shop, /project requirements add ...",
    "  6. Find earlier output:          /versions <path>, /recover <path> [--version n]",
    "Generated artifacts are auto-saved in the background and flushed on /exit.",
];

fn help(topic: Option<&str>) -> InteractionResult {
    match topic {
        Some(topic) => {
            let name = topic.trim_start_matches('/');
            match find_builtin_command(name) {
                Some(command) => {
                    let mut notices = vec![
                        Notice::info(command.usage),
                        Notice::info(command.description),
                    ];
                    if !command.aliases.is_empty() {
                        let aliases: Vec<String> =
                            command.aliases.iter().map(|a| format!("/{a}")).collect();
                        notices.push(Notice::info(format!("Aliases: {}", aliases.join(", "))));
                    }
                    InteractionResult::Notices(notices)
                }
                None => error_result(
                    &CodeobitError::UnknownCommand {
                        name: name.to_string(),
                    },
                    Vec::new(),
                ),
            }
        }
        None => {
            let mut notices: Vec<Notice> = builtin_commands()
                .iter()
                .map(|command| Notice::info(format!("{:<36} {}", command.usage, command.description)))
                .collect();
            notices.push(Notice::info(
                "Anything else is sent to the AI. Mention files with @path; switch providers with !gpt, !claude, ...",
            ));
            InteractionResult::Notices(notices)
        }
    }
}

/// Logical path for an explicit `--out` target: the relative path itself
/// when it is clean, otherwise its file name.
fn output_logical_path(output: &Path) -> Option<String> {
    let text = output.to_string_lossy();
    if output.is_relative() && normalize_logical_path(&text).is_ok() {
        return Some(text.into_owned());
    }
    output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn describe_outcome(outcome: &SaveOutcome) -> Vec<Notice> {
    let mut notices = Vec::new();
    if let Some(path) = outcome.primary_path() {
        notices.push(Notice::success(format!(
            "Saved {} v{} ({} bytes) to {}",
            outcome.logical_path,
            outcome.version_index,
            outcome.size_bytes,
            path.display()
        )));
    }
    for attempt in &outcome.attempted_locations {
        if !attempt.succeeded() || Some(attempt.location) == outcome.succeeded_at {
            continue;
        }
        if let Some(path) = &attempt.physical_path {
            notices.push(Notice::info(format!("Also written to {}", path.display())));
        }
    }
    for failure in outcome.failures() {
        let message = failure
            .error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or("unknown error");
        let place = failure
            .physical_path
            .as_ref()
            .map(|p| format!(" ({})", p.display()))
            .unwrap_or_default();
        notices.push(Notice::warning(format!(
            "Could not write {}{place}: {message}",
            failure.location
        )));
    }
    notices
}

fn error_notices(err: &CodeobitError) -> Vec<Notice> {
    let mut notices = vec![Notice::error(err.to_string())];
    match err {
        CodeobitError::UnknownCommand { .. } => {
            notices.push(Notice::info("Type /help to see available commands"));
        }
        CodeobitError::Arg { command, .. } => {
            if let Some(builtin) = find_builtin_command(command) {
                notices.push(Notice::info(format!("Usage: {}", builtin.usage)));
            }
        }
        CodeobitError::UnknownProvider { .. } => {
            notices.push(Notice::info("Use /provider list to see available providers"));
        }
        CodeobitError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } => {
            notices.push(Notice::info(format!(
                "Retry in {secs}s, or switch provider with /provider set <id>"
            )));
        }
        CodeobitError::RateLimited { .. } | CodeobitError::ProviderUnavailable { .. } => {
            notices.push(Notice::info(
                "Retry the request, or switch provider with /provider set <id> (e.g. !gemini)",
            ));
        }
        CodeobitError::SaveFailed { outcome, .. } => {
            notices.extend(describe_outcome(outcome));
        }
        _ => {}
    }
    notices
}

fn error_result(err: &CodeobitError, mut notices: Vec<Notice>) -> InteractionResult {
    tracing::debug!(kind = %err.kind(), error = %err, "Request failed");
    notices.extend(error_notices(err));
    InteractionResult::Notices(notices)
}
