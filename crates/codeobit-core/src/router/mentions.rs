//! `@path` file-reference extraction and resolution.

use super::action::FileReference;
use crate::fs::FileLookup;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Subdirectories searched when a reference is not found at a root.
pub const WELL_KNOWN_DIRS: &[&str] = &["src", "docs", "tests", "lib"];

// `@` must start the text or follow whitespace/opening punctuation, so email
// addresses are not matched.
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s(\[{"'`,;])@([A-Za-z0-9._/\-]+)"#).expect("mention pattern is valid")
});

/// Extracts unique `@path` tokens in order of first appearance.
///
/// Trailing dots (sentence punctuation) are not part of the token.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for caps in MENTION_RE.captures_iter(text) {
        let Some(raw) = caps.get(1) else { continue };
        let token = raw.as_str().trim_end_matches('.');
        if token.is_empty() || tokens.iter().any(|t| t == token) {
            continue;
        }
        tokens.push(token.to_string());
    }
    tokens
}

/// Resolves `@path` tokens against the filesystem in a fixed search order.
pub struct MentionResolver<'a> {
    lookup: &'a dyn FileLookup,
    project_root: Option<&'a Path>,
    cwd: &'a Path,
}

impl<'a> MentionResolver<'a> {
    pub fn new(lookup: &'a dyn FileLookup, project_root: Option<&'a Path>, cwd: &'a Path) -> Self {
        Self {
            lookup,
            project_root,
            cwd,
        }
    }

    pub fn resolve_all(&self, text: &str) -> Vec<FileReference> {
        extract_mentions(text)
            .into_iter()
            .map(|token| {
                let resolved = self.resolve(&token);
                if resolved.is_none() {
                    tracing::debug!(token = %token, "Unresolved file reference");
                }
                FileReference { token, resolved }
            })
            .collect()
    }

    /// First hit wins:
    /// 1. `<project root>/<token>`
    /// 2. `<cwd>/<token>`
    /// 3. `<root>/<well-known dir>/<token>` for each root
    /// 4. `<root>/<child dir>/<token>` for each non-hidden child, sorted by name
    ///
    /// Absolute tokens and tokens containing `..` never resolve.
    pub fn resolve(&self, token: &str) -> Option<PathBuf> {
        let relative = Path::new(token);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }

        let roots = self.roots();

        let direct = roots.iter().map(|root| root.join(relative));
        let well_known = roots.iter().flat_map(|root| {
            WELL_KNOWN_DIRS
                .iter()
                .map(move |dir| root.join(dir).join(relative))
        });

        if let Some(hit) = direct.chain(well_known).find(|p| self.lookup.exists(p)) {
            return Some(hit);
        }

        roots.iter().find_map(|root| {
            let mut children: Vec<PathBuf> = self
                .lookup
                .list_dir(root)
                .into_iter()
                .filter(|child| self.lookup.is_dir(child))
                .filter(|child| {
                    child
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| !n.starts_with('.') && !WELL_KNOWN_DIRS.contains(&n))
                })
                .collect();
            children.sort();
            children
                .into_iter()
                .map(|child| child.join(relative))
                .find(|p| self.lookup.exists(p))
        })
    }

    /// Project root first, then cwd (skipped when identical).
    fn roots(&self) -> Vec<&'a Path> {
        let mut roots = Vec::with_capacity(2);
        if let Some(root) = self.project_root {
            roots.push(root);
        }
        if !roots.contains(&self.cwd) {
            roots.push(self.cwd);
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFileLookup;

    #[test]
    fn test_extract_mentions() {
        let tokens = extract_mentions("look at @src/app.py, and @missing.py. also @src/app.py");
        assert_eq!(tokens, vec!["src/app.py", "missing.py"]);

        assert!(extract_mentions("mail me at dev@example.com").is_empty());
        assert_eq!(extract_mentions("(@lib/x.rs)"), vec!["lib/x.rs"]);
    }

    #[test]
    fn test_project_root_beats_cwd() {
        let lookup = InMemoryFileLookup::with_files(["/proj/app.py", "/cwd/app.py"]);
        let resolver =
            MentionResolver::new(&lookup, Some(Path::new("/proj")), Path::new("/cwd"));
        assert_eq!(resolver.resolve("app.py"), Some(PathBuf::from("/proj/app.py")));
    }

    #[test]
    fn test_well_known_dirs_then_children() {
        let lookup = InMemoryFileLookup::with_files([
            "/proj/docs/guide.md",
            "/proj/tests/guide.md",
            "/proj/pkg/util.py",
            "/proj/.git/util.py",
        ]);
        let resolver = MentionResolver::new(&lookup, Some(Path::new("/proj")), Path::new("/proj"));

        assert_eq!(
            resolver.resolve("guide.md"),
            Some(PathBuf::from("/proj/docs/guide.md"))
        );
        assert_eq!(
            resolver.resolve("util.py"),
            Some(PathBuf::from("/proj/pkg/util.py"))
        );
        assert_eq!(resolver.resolve("nope.py"), None);
    }

    #[test]
    fn test_escaping_tokens_never_resolve() {
        let lookup = InMemoryFileLookup::with_files(["/etc/passwd", "/proj/x"]);
        let resolver = MentionResolver::new(&lookup, None, Path::new("/proj/sub"));
        assert_eq!(resolver.resolve("../x"), None);
        assert_eq!(resolver.resolve("/etc/passwd"), None);
    }
}
