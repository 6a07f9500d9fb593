//! Conversation turn types.

use crate::artifact::ArtifactRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents the role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Input typed by the user.
    User,
    /// Text returned by the AI provider.
    Assistant,
    /// System-generated message (provider switches, save notices).
    System,
}

/// A single message in the session history.
///
/// Turns are immutable once created; the session only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: TurnRole,
    text: String,
    timestamp: DateTime<Utc>,
    referenced_artifacts: Vec<ArtifactRef>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, text: impl Into<String>, artifacts: Vec<ArtifactRef>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
            referenced_artifacts: artifacts,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text, Vec::new())
    }

    pub fn assistant(text: impl Into<String>, artifacts: Vec<ArtifactRef>) -> Self {
        Self::new(TurnRole::Assistant, text, artifacts)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(TurnRole::System, text, Vec::new())
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn referenced_artifacts(&self) -> &[ArtifactRef] {
        &self.referenced_artifacts
    }

    /// Renders the turn the way it appears in prompt context.
    pub fn render(&self) -> String {
        let label = match self.role {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
            TurnRole::System => "System",
        };
        format!("{}: {}\n", label, self.text)
    }
}
