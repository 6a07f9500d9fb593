//! System instructions and artifact naming for AI requests.

use chrono::Utc;
use codeobit_core::artifact::ArtifactKind;
use codeobit_core::router::{GenerateOperation, Intent};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+\-.]*)[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
});

/// Per-process counter appended to generated artifact names.
static NAME_SEQUENCE: AtomicU64 = AtomicU64::new(1);

const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("rust", "rs"),
    ("rs", "rs"),
    ("python", "py"),
    ("py", "py"),
    ("javascript", "js"),
    ("js", "js"),
    ("typescript", "ts"),
    ("ts", "ts"),
    ("go", "go"),
    ("java", "java"),
    ("kotlin", "kt"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("csharp", "cs"),
    ("ruby", "rb"),
    ("php", "php"),
    ("swift", "swift"),
    ("bash", "sh"),
    ("sh", "sh"),
    ("shell", "sh"),
    ("sql", "sql"),
    ("html", "html"),
    ("css", "css"),
    ("yaml", "yaml"),
    ("json", "json"),
    ("toml", "toml"),
];

const GENERAL_INSTRUCTION: &str = "You are codeobit, an AI software engineering assistant. \
Answer precisely and prefer concrete, working examples.";

/// Role instruction prepended to a natural-language request.
pub fn intent_instruction(intent: Intent) -> &'static str {
    match intent {
        Intent::Requirements => {
            "You are a business analyst expert. Help create detailed software requirements \
including user stories, acceptance criteria, and functional specifications."
        }
        Intent::Design => {
            "You are a software architect. Help create system designs, architecture diagrams, \
and technical specifications. Focus on scalability and maintainability."
        }
        Intent::Code => {
            "You are an expert software developer. Generate clean, well-documented, \
production-ready code."
        }
        Intent::Test => {
            "You are a QA engineer and testing expert. Create comprehensive test suites, \
test cases, and testing strategies."
        }
        Intent::Security => {
            "You are a cybersecurity expert. Analyze code for vulnerabilities and \
suggest security improvements."
        }
        Intent::Docs => {
            "You are a technical writer. Create clear documentation \
including README files, API docs, and user guides."
        }
        Intent::General => GENERAL_INSTRUCTION,
    }
}

/// Role instruction for `/generate`, `/analyze`, `/test` and `/docs`.
pub fn operation_instruction(operation: GenerateOperation) -> &'static str {
    match operation {
        GenerateOperation::Generate => {
            "You are an expert software developer. Produce the requested code as a single \
fenced code block followed by a short explanation."
        }
        GenerateOperation::Analyze => {
            "You are a senior code reviewer. Produce a structured markdown report covering \
correctness, design, performance and security findings."
        }
        GenerateOperation::Test => {
            "You are a QA engineer. Produce a complete test file as a single fenced code block \
covering normal, edge and failure cases."
        }
        GenerateOperation::Docs => {
            "You are a technical writer. Produce markdown documentation for the request."
        }
    }
}

/// Joins an instruction, the request and optional inlined file context.
pub fn compose(instruction: &str, request: &str, references: &str) -> String {
    let mut prompt = format!("{instruction}\n\nRequest:\n{request}\n");
    if !references.is_empty() {
        prompt.push_str("\nReferenced files:\n");
        prompt.push_str(references);
    }
    prompt
}

pub fn browse_summary_prompt(url: &str, title: Option<&str>, text: &str) -> String {
    format!(
        "Summarize the following web page for a software engineer. List the key points, \
any APIs or techniques described, and how they could apply to a project.\n\n\
URL: {url}\nTitle: {}\n\nContent:\n{text}\n",
        title.unwrap_or("(untitled)")
    )
}

/// Pulls the body of the first fenced code block, if any.
pub fn extract_code_block(response: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(response)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|body| !body.trim().is_empty())
}

/// File extension implied by the language tag of the first fenced block.
pub fn fence_extension(response: &str) -> Option<&'static str> {
    let language = FENCED_BLOCK
        .captures(response)
        .and_then(|caps| caps.get(1))?
        .as_str()
        .to_ascii_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
}

/// Content worth saving for an artifact of `kind`.
///
/// Code and tests keep only the first fenced block when there is one.
pub fn artifact_content(kind: ArtifactKind, response: &str) -> String {
    match kind {
        ArtifactKind::Code | ArtifactKind::Test => extract_code_block(response)
            .map(str::to_string)
            .unwrap_or_else(|| response.to_string()),
        ArtifactKind::Doc | ArtifactKind::Report => response.to_string(),
    }
}

/// Lowercase, dash-separated slug of at most `max_words` words.
pub fn slug(text: &str, max_words: usize) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .take(max_words)
        .map(|word| word.to_ascii_lowercase())
        .collect();
    if words.is_empty() {
        "untitled".to_string()
    } else {
        words.join("-")
    }
}

/// Logical path for an artifact generated from `prompt`.
///
/// `<slug>-<yyyymmdd-HHMMSSmmm>-<n>.<ext>`. The millisecond timestamp keeps
/// sessions apart and `n` counts names handed out by this process, so two
/// requests with the same wording never share a logical path. Code and
/// tests take their extension from the response's code fence when it names
/// a known language.
pub fn artifact_name(kind: ArtifactKind, prompt: &str, response: &str) -> String {
    let extension = match kind {
        ArtifactKind::Code | ArtifactKind::Test => fence_extension(response),
        ArtifactKind::Doc | ArtifactKind::Report => None,
    }
    .unwrap_or_else(|| kind.default_extension());
    format!(
        "{}-{}-{}.{}",
        slug(prompt, 5),
        Utc::now().format("%Y%m%d-%H%M%S%3f"),
        NAME_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        extension
    )
}

/// Logical path for a `/browse` summary.
pub fn web_summary_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    format!("web/{}.md", slug(without_scheme, 8))
}
