use std::borrow::Cow::{self, Borrowed, Owned};

use codeobit_core::provider::ProviderId;
use codeobit_core::router::builtin_commands;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use strum::IntoEnumIterator;

const PROVIDER_SET_PREFIX: &str = "/provider set ";

/// rustyline helper: slash-command completion, hints and highlighting.
#[derive(Clone)]
pub struct CliHelper {
    commands: Vec<String>,
    providers: Vec<String>,
}

impl CliHelper {
    pub fn new() -> Self {
        let commands = builtin_commands()
            .iter()
            .flat_map(|cmd| std::iter::once(cmd.name).chain(cmd.aliases.iter().copied()))
            .map(|name| format!("/{name}"))
            .collect();
        let providers = ProviderId::iter().map(|id| id.to_string()).collect();
        Self {
            commands,
            providers,
        }
    }

    fn candidates(&self, line: &str) -> (usize, Vec<&str>) {
        if let Some(partial) = line.strip_prefix(PROVIDER_SET_PREFIX) {
            let matches = self
                .providers
                .iter()
                .filter(|id| id.starts_with(partial))
                .map(String::as_str)
                .collect();
            return (PROVIDER_SET_PREFIX.len(), matches);
        }

        if line.starts_with('/') && !line.contains(' ') {
            let matches = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(String::as_str)
                .collect();
            return (0, matches);
        }

        (0, Vec::new())
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') || line.starts_with('!') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, matches) = self.candidates(line);
        let typed = line.len() - start;
        matches
            .into_iter()
            .find(|candidate| candidate.len() > typed)
            .map(|candidate| candidate[typed..].to_string())
    }
}

impl Validator for CliHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_candidates_include_aliases() {
        let helper = CliHelper::new();
        let (start, matches) = helper.candidates("/hi");
        assert_eq!(start, 0);
        assert!(matches.contains(&"/history"));
        assert!(matches.contains(&"/hist"));

        let (_, matches) = helper.candidates("/cl");
        assert!(matches.contains(&"/clear"));
        assert!(matches.contains(&"/cls"));
    }

    #[test]
    fn test_provider_candidates() {
        let helper = CliHelper::new();
        let (start, matches) = helper.candidates("/provider set gr");
        assert_eq!(start, PROVIDER_SET_PREFIX.len());
        assert_eq!(matches, vec!["groq"]);
    }

    #[test]
    fn test_no_candidates_for_prose() {
        let helper = CliHelper::new();
        assert!(helper.candidates("write a parser").1.is_empty());
        assert!(helper.candidates("/generate a parser").1.is_empty());
    }
}
