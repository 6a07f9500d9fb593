//! Bounded in-process session state.

use super::turn::{ConversationTurn, TurnRole};
use super::usage::TokenUsage;
use crate::artifact::ArtifactRef;
use crate::error::Result;
use crate::provider::{ProviderId, ProviderRegistry};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Default number of turns retained in history.
pub const DEFAULT_MAX_TURNS: usize = 50;

/// Terminal color theme.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    #[default]
    Auto,
    Dark,
    Light,
}

/// The project currently open in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub name: String,
    pub root: PathBuf,
}

impl ProjectRef {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}

/// Conversation history plus the user's current selections.
///
/// Owned by the running process and passed by `&mut` to whatever needs to
/// mutate it. History is a FIFO bounded by `max_turns`.
#[derive(Debug, Clone)]
pub struct SessionContext {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
    active_project: Option<ProjectRef>,
    active_provider: ProviderId,
    theme: Theme,
    registry: ProviderRegistry,
    usage: TokenUsage,
}

impl SessionContext {
    /// Creates a session whose active provider is the registry default.
    ///
    /// `max_turns` is clamped to at least 1.
    pub fn new(registry: ProviderRegistry, max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns.min(DEFAULT_MAX_TURNS) + 1),
            max_turns,
            active_project: None,
            active_provider: registry.default_provider(),
            theme: Theme::default(),
            registry,
            usage: TokenUsage::default(),
        }
    }

    /// Appends a turn, evicting the oldest ones beyond `max_turns`.
    pub fn append_turn(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Switches the active provider.
    ///
    /// On failure the current provider is left untouched.
    pub fn set_provider(&mut self, id: &str) -> Result<ProviderId> {
        let provider = self.registry.resolve(id)?;
        if provider != self.active_provider {
            tracing::info!(from = %self.active_provider, to = %provider, "Switched provider");
        }
        self.active_provider = provider;
        Ok(provider)
    }

    /// Renders the most recent turns in chronological order within `max_chars`.
    ///
    /// Whole turns only: the newest turns that fit are kept and older ones are
    /// dropped. A single turn larger than the budget yields an empty summary.
    pub fn summary_for_prompt(&self, max_chars: usize) -> String {
        let mut used = 0usize;
        let mut start = self.turns.len();

        for (index, turn) in self.turns.iter().enumerate().rev() {
            let len = turn.render().chars().count();
            if used + len > max_chars {
                break;
            }
            used += len;
            start = index;
        }

        self.turns
            .iter()
            .skip(start)
            .map(ConversationTurn::render)
            .collect()
    }

    /// Drops every turn. Token usage keeps counting for the whole session.
    pub fn clear_history(&mut self) {
        self.turns.clear();
    }

    /// Adds one completed AI request to the usage estimate.
    pub fn record_usage(&mut self, prompt: &str, response: &str) {
        self.usage.record(prompt, response);
    }

    pub fn usage(&self) -> &TokenUsage {
        &self.usage
    }

    /// Most recent artifact referenced by an assistant turn.
    pub fn last_assistant_artifact(&self) -> Option<&ArtifactRef> {
        self.turns
            .iter()
            .rev()
            .filter(|turn| turn.role() == TurnRole::Assistant)
            .find_map(|turn| turn.referenced_artifacts().last())
    }

    pub fn turns(&self) -> impl ExactSizeIterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn active_provider(&self) -> ProviderId {
        self.active_provider
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn active_project(&self) -> Option<&ProjectRef> {
        self.active_project.as_ref()
    }

    pub fn set_active_project(&mut self, project: Option<ProjectRef>) {
        self.active_project = project;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(ProviderRegistry::default(), DEFAULT_MAX_TURNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::error::ErrorKind;

    #[test]
    fn test_append_evicts_oldest_first() {
        let mut session = SessionContext::new(ProviderRegistry::default(), 50);
        for i in 1..=51 {
            session.append_turn(ConversationTurn::user(format!("turn {i}")));
        }

        assert_eq!(session.len(), 50);
        let texts: Vec<_> = session.turns().map(|t| t.text().to_string()).collect();
        assert_eq!(texts.first().map(String::as_str), Some("turn 2"));
        assert_eq!(texts.last().map(String::as_str), Some("turn 51"));
    }

    #[test]
    fn test_zero_max_turns_keeps_latest() {
        let mut session = SessionContext::new(ProviderRegistry::default(), 0);
        assert_eq!(session.max_turns(), 1);

        session.append_turn(ConversationTurn::user("first"));
        session.append_turn(ConversationTurn::user("second"));

        assert_eq!(session.len(), 1);
        assert_eq!(session.turns().next().map(|t| t.text()), Some("second"));
    }

    #[test]
    fn test_set_provider_failure_leaves_state_unchanged() {
        let registry = ProviderRegistry::new(vec![ProviderId::OpenAi], ProviderId::Gemini);
        let mut session = SessionContext::new(registry, 10);

        let err = session.set_provider("claude").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProvider);
        assert_eq!(session.active_provider(), ProviderId::Gemini);

        assert_eq!(session.set_provider("gpt").unwrap(), ProviderId::OpenAi);
        assert_eq!(session.active_provider(), ProviderId::OpenAi);
    }

    #[test]
    fn test_usage_survives_clear_history() {
        let mut session = SessionContext::default();
        session.record_usage("explain this function", "it parses flags");
        session.clear_history();

        assert_eq!(session.usage().requests, 1);
        assert_eq!(session.usage().total(), 4 + 4);
    }

    #[test]
    fn test_summary_is_chronological_and_whole_turn() {
        let mut session = SessionContext::default();
        session.append_turn(ConversationTurn::user("aaaaaaaaaa"));
        session.append_turn(ConversationTurn::assistant("bbbb", Vec::new()));
        session.append_turn(ConversationTurn::user("cccc"));

        let full = session.summary_for_prompt(10_000);
        assert_eq!(full, "User: aaaaaaaaaa\nAssistant: bbbb\nUser: cccc\n");

        // "Assistant: bbbb\n" = 16 chars, "User: cccc\n" = 11 chars
        let partial = session.summary_for_prompt(30);
        assert_eq!(partial, "Assistant: bbbb\nUser: cccc\n");

        assert_eq!(session.summary_for_prompt(5), "");
    }

    #[test]
    fn test_last_assistant_artifact() {
        let mut session = SessionContext::default();
        assert!(session.last_assistant_artifact().is_none());

        session.append_turn(ConversationTurn::assistant(
            "here",
            vec![ArtifactRef::new("src/app.py", ArtifactKind::Code)],
        ));
        session.append_turn(ConversationTurn::user("thanks"));

        assert_eq!(
            session.last_assistant_artifact().map(|a| a.logical_path()),
            Some("src/app.py")
        );
    }
}
