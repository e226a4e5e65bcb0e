//! Job Fetch Adapter: loads a posting in a real browser and reduces it to plain text.
//!
//! Flow: launch → navigate → settle → read `<body>` → close browser →
//!       write temp file → read back + detect encoding → HTML to text.
//!
//! The browser is closed on every path once launched, and the temp file is a
//! `NamedTempFile` so it is removed when the round trip returns or fails.

pub mod browser;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scraper::{node::Node, ElementRef, Html};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::fetch::browser::{BrowserLauncher, BrowserSession};

/// Elements whose contents never reach the model.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Elements that end a line of text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Raw content of one fetched job posting. Lives only as long as the request.
#[derive(Debug, Clone)]
pub struct JobPosting {
    pub url: String,
    pub markup: String,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

pub struct JobFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    settle_delay: Duration,
    scratch_dir: Option<PathBuf>,
}

impl JobFetcher {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &PipelineConfig) -> Self {
        Self {
            launcher,
            settle_delay: config.settle_delay,
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    /// Fetches `url` and returns its rendered text.
    pub async fn fetch(&self, url: &str) -> Result<JobPosting, PipelineError> {
        info!("Fetching job posting from {url}");

        // Detached: teardown still runs if the caller drops this future mid-render.
        let markup = tokio::spawn(render_and_close(
            Arc::clone(&self.launcher),
            url.to_string(),
            self.settle_delay,
        ))
        .await
        .map_err(|e| PipelineError::Fetch(format!("Browser task failed: {e}")))??;

        let scratch_dir = self.scratch_dir.clone();
        let round_trip_markup = markup.clone();
        let text = tokio::task::spawn_blocking(move || {
            extract_text_via_temp_file(&round_trip_markup, scratch_dir.as_deref())
        })
        .await
        .map_err(|e| PipelineError::Fetch(format!("Text extraction task failed: {e}")))??;

        info!("Fetched {} chars of text from {url}", text.len());

        Ok(JobPosting {
            url: url.to_string(),
            markup,
            text,
            fetched_at: Utc::now(),
        })
    }
}

/// Launches a session, renders `url` and closes the session on every path.
async fn render_and_close(
    launcher: Arc<dyn BrowserLauncher>,
    url: String,
    settle_delay: Duration,
) -> Result<String, PipelineError> {
    let mut session = launcher.launch().await?;
    let markup = render(session.as_mut(), &url, settle_delay).await;
    if let Err(e) = session.close().await {
        warn!("Browser teardown failed: {e}");
    }
    markup
}

async fn render(
    session: &mut dyn BrowserSession,
    url: &str,
    settle_delay: Duration,
) -> Result<String, PipelineError> {
    session.navigate(url).await?;
    if !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }
    session.rendered_body().await
}

/// Persists `markup` to a temp `.html` file, loads it back and parses it to text.
/// The file is deleted when this returns, on success and on error.
pub fn extract_text_via_temp_file(
    markup: &str,
    scratch_dir: Option<&std::path::Path>,
) -> Result<String, PipelineError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("job-posting-").suffix(".html");
    let mut file = match scratch_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| PipelineError::Fetch(format!("Failed to create temp file: {e}")))?;

    file.write_all(markup.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| PipelineError::Fetch(format!("Failed to write temp file: {e}")))?;

    let bytes = std::fs::read(file.path())
        .map_err(|e| PipelineError::Fetch(format!("Failed to read temp file: {e}")))?;

    let text = html_to_text(&decode_text(&bytes));
    if text.is_empty() {
        return Err(PipelineError::Fetch(
            "job posting contained no text".to_string(),
        ));
    }
    Ok(text)
}

/// Decodes file bytes, honouring a UTF-8/UTF-16 byte order mark.
/// Unmarked input is UTF-8; invalid sequences are replaced rather than rejected.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!("Page is not valid UTF-8 ({e}); decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn decode_utf16(bytes: &[u8], read_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Reduces HTML to readable text: one line per block element, whitespace collapsed,
/// scripts and styles dropped.
pub fn html_to_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIP_TAGS.contains(&name) {
        return;
    }

    let is_block = BLOCK_TAGS.contains(&name);
    if is_block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            // Line breaks inside text nodes are layout, not structure
            Node::Text(text) => out.extend(text.chars().map(|c| match c {
                '\n' | '\r' => ' ',
                other => other,
            })),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }

    if is_block {
        out.push('\n');
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
