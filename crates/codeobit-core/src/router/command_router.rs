//! Maps one line of input to exactly one [`Action`].

use super::action::{Action, NaturalLanguageRequest, SlashCommand};
use super::builtin::find_builtin_command;
use super::intent::Intent;
use super::mentions::MentionResolver;
use super::parse::parse_command;
use crate::error::CodeobitError;
use crate::fs::FileLookup;
use crate::provider::provider_shortcut;
use crate::session::{ConversationTurn, SessionContext};
use std::path::PathBuf;
use std::sync::Arc;

/// Bare words that leave the REPL without a leading `/`.
const EXIT_WORDS: &[&str] = &["exit", "quit"];

/// Stateless router over a filesystem lookup.
///
/// Routing is synchronous and never performs network I/O.
pub struct CommandRouter {
    lookup: Arc<dyn FileLookup>,
    cwd: PathBuf,
}

impl CommandRouter {
    pub fn new(lookup: Arc<dyn FileLookup>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            lookup,
            cwd: cwd.into(),
        }
    }

    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    /// Routes `input`, recording it as a user turn first.
    ///
    /// Precedence: provider shortcuts, exit words, slash commands, then free
    /// text. Failures are carried inside the returned action.
    pub fn route(&self, input: &str, session: &mut SessionContext) -> Action {
        session.append_turn(ConversationTurn::user(input));

        let line = input.trim();

        if let Some(provider_id) = detect_provider_switch(line) {
            tracing::debug!(provider = %provider_id, "Routed provider shortcut");
            return Action::ProviderSwitch { provider_id };
        }

        if EXIT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(line)) {
            return Action::Exit;
        }

        if let Some(body) = line.strip_prefix('/') {
            return self.route_slash(body);
        }

        let project_root = session.active_project().map(|p| p.root.as_path());
        let resolver = MentionResolver::new(self.lookup.as_ref(), project_root, &self.cwd);
        let references = resolver.resolve_all(line);

        Action::NaturalLanguageRequest(NaturalLanguageRequest {
            text: line.to_string(),
            references,
            intent: Intent::classify(line),
        })
    }

    fn route_slash(&self, body: &str) -> Action {
        let mut tokens = body.split_whitespace().map(str::to_string);
        let name = tokens.next().unwrap_or_default();
        let args: Vec<String> = tokens.collect();

        let Some(builtin) = find_builtin_command(&name) else {
            tracing::debug!(name = %name, "Unknown slash command");
            return Action::SlashCommand(SlashCommand {
                parsed: Err(CodeobitError::UnknownCommand { name: name.clone() }),
                name,
                args,
            });
        };

        if builtin.name == "exit" {
            return Action::Exit;
        }

        let parsed = match parse_command(builtin.name, &args) {
            Some(Ok(command)) => Ok(command),
            Some(Err(error)) => Err(CodeobitError::Arg {
                command: builtin.name.to_string(),
                error,
            }),
            None => Err(CodeobitError::UnknownCommand { name: name.clone() }),
        };

        Action::SlashCommand(SlashCommand { name, args, parsed })
    }
}

/// Exact-match provider shortcuts: `!gpt`-style tokens or `use provider <id>`.
///
/// The id is returned unvalidated; the session checks it against the registry.
fn detect_provider_switch(line: &str) -> Option<String> {
    if let Some(provider) = provider_shortcut(line) {
        return Some(provider.to_string());
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [use_word, provider_word, id]
            if use_word.eq_ignore_ascii_case("use")
                && provider_word.eq_ignore_ascii_case("provider") =>
        {
            Some(id.to_lowercase())
        }
        _ => None,
    }
}
