//! What the REPL should show after one line of input.

use codeobit_core::provider::ProviderId;

/// Severity of a line of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Outcome of handling one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionResult {
    /// Nothing to show (blank input)
    NoOp,
    /// Feedback lines, in display order
    Notices(Vec<Notice>),
    /// Text produced by the AI collaborator plus any feedback about it
    AiResponse {
        provider: ProviderId,
        text: String,
        notices: Vec<Notice>,
    },
    /// History was cleared; the REPL should also clear the screen
    Cleared,
    /// The user asked to leave
    Exit,
}

impl InteractionResult {
    pub fn notice(notice: Notice) -> Self {
        InteractionResult::Notices(vec![notice])
    }

    /// Every notice carried by this result.
    pub fn notices(&self) -> &[Notice] {
        match self {
            InteractionResult::Notices(notices)
            | InteractionResult::AiResponse { notices, .. } => notices,
            _ => &[],
        }
    }

    pub fn has_error(&self) -> bool {
        self.notices()
            .iter()
            .any(|notice| notice.level == NoticeLevel::Error)
    }
}
