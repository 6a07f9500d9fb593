//! Fetches web pages for `/browse` and reduces them to readable text.

use async_trait::async_trait;
use codeobit_core::ai::{WebFetcher, WebPage};
use codeobit_core::router::ArgError;
use codeobit_core::{CodeobitError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on the extracted text handed to the summarizer
pub const MAX_PAGE_CHARS: usize = 15_000;
const USER_AGENT: &str = concat!("codeobit/", env!("CARGO_PKG_VERSION"));

const NOISE_ELEMENTS: [&str; 7] = [
    "script", "style", "nav", "footer", "header", "iframe", "noscript",
];

static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    NOISE_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("noise pattern is valid")
        })
        .collect()
});
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title pattern is valid"));
static MAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(article|main)\b[^>]*>(.*?)</(?:article|main)\s*>")
        .expect("main pattern is valid")
});
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// [`WebFetcher`] over HTTP(S) with reqwest.
#[derive(Clone)]
pub struct HttpWebFetcher {
    client: Client,
}

impl HttpWebFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CodeobitError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebFetcher for HttpWebFetcher {
    async fn fetch(&self, url: &str) -> Result<WebPage> {
        tracing::debug!(%url, "Fetching web page");
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| CodeobitError::io(format!("could not fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CodeobitError::io(format!(
                "could not fetch {url}: HTTP {status}"
            )));
        }
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| CodeobitError::io(format!("could not read {url}: {e}")))?;

        let page = extract_page(&final_url, &body);
        tracing::info!(url = %page.url, chars = page.text.len(), "Fetched web page");
        Ok(page)
    }
}

/// Extracts the title and visible text from an HTML document.
///
/// `<article>`/`<main>` content is preferred when present. Text is capped at
/// [`MAX_PAGE_CHARS`] characters.
pub fn extract_page(url: &str, html: &str) -> WebPage {
    let title = TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse(&decode_entities(m.as_str())))
        .filter(|title| !title.is_empty());

    let mut cleaned = COMMENT.replace_all(html, " ").into_owned();
    for pattern in NOISE.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let body = MAIN
        .captures(&cleaned)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or(cleaned);

    let text = collapse(&decode_entities(&TAG.replace_all(&body, " ")));
    let text = text.chars().take(MAX_PAGE_CHARS).collect();

    WebPage {
        url: url.to_string(),
        title,
        text,
    }
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Adds `https://` when no scheme is given and rejects anything but http(s).
pub fn normalize_url(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CodeobitError::Arg {
            command: "browse".to_string(),
            error: ArgError::MissingArgument("url"),
        });
    }

    let url = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let scheme_ok = ["http://", "https://"]
        .iter()
        .any(|scheme| {
            url.len() > scheme.len()
                && url
                    .get(..scheme.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        });
    if !scheme_ok {
        return Err(CodeobitError::Arg {
            command: "browse".to_string(),
            error: ArgError::InvalidValue {
                name: "url",
                value: input.to_string(),
                expected: "an http or https URL",
            },
        });
    }
    Ok(url)
}
