//! Keyword-based intent classification for free text.

use crate::artifact::ArtifactKind;

/// What a natural-language request is mainly about.
///
/// Variants are declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    Requirements,
    Design,
    Code,
    Test,
    Security,
    Docs,
    General,
}

const CLASSIFIED: [Intent; 6] = [
    Intent::Requirements,
    Intent::Design,
    Intent::Code,
    Intent::Test,
    Intent::Security,
    Intent::Docs,
];

impl Intent {
    /// Classifies text by the first intent (in priority order) whose keyword
    /// appears anywhere in it, case-insensitively.
    pub fn classify(text: &str) -> Intent {
        let lower = text.to_lowercase();
        CLASSIFIED
            .into_iter()
            .find(|intent| intent.keywords().iter().any(|kw| lower.contains(kw)))
            .unwrap_or(Intent::General)
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Intent::Requirements => &["requirements", "user story", "specification"],
            Intent::Design => &["design", "architecture", "diagram"],
            Intent::Code => &["code", "function", "class", "implement"],
            Intent::Test => &["test", "testing", "unit test"],
            Intent::Security => &["security", "vulnerability", "secure"],
            Intent::Docs => &["document", "docs", "readme"],
            Intent::General => &[],
        }
    }

    /// Kind of artifact produced for this intent, if any.
    pub fn artifact_kind(&self) -> Option<ArtifactKind> {
        match self {
            Intent::Requirements | Intent::Design | Intent::Docs => Some(ArtifactKind::Doc),
            Intent::Code => Some(ArtifactKind::Code),
            Intent::Test => Some(ArtifactKind::Test),
            Intent::Security => Some(ArtifactKind::Report),
            Intent::General => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_priority() {
        assert_eq!(Intent::classify("Write a user story for login"), Intent::Requirements);
        assert_eq!(
            Intent::classify("Design the architecture and implement it"),
            Intent::Design
        );
        assert_eq!(Intent::classify("implement a parser"), Intent::Code);
        assert_eq!(Intent::classify("add unit test coverage"), Intent::Test);
        assert_eq!(Intent::classify("is this SECURE?"), Intent::Security);
        assert_eq!(Intent::classify("update the README"), Intent::Docs);
        assert_eq!(Intent::classify("hello there"), Intent::General);
    }

    #[test]
    fn test_artifact_kind_mapping() {
        assert_eq!(Intent::Security.artifact_kind(), Some(ArtifactKind::Report));
        assert_eq!(Intent::Design.artifact_kind(), Some(ArtifactKind::Doc));
        assert_eq!(Intent::General.artifact_kind(), None);
    }
}
