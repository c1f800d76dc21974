//! Best-effort text extraction from uploaded documents.
//!
//! Nothing here fails: formats we cannot read produce a bracketed
//! diagnostic string that still works as (weak) prompt text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("script pattern is valid")
});
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static PDF_SHOW_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(((?:[^()\\]|\\.)*)\)\s*Tj|\[((?:[^\]\\]|\\.)*)\]\s*TJ").expect("pdf pattern is valid")
});
static PDF_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(((?:[^()\\]|\\.)*)\)").expect("pdf string pattern is valid"));

/// Kind of document as far as extraction is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Html,
    Pdf,
    Binary,
    Unsupported,
}

impl DocumentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/html" | "application/xhtml+xml" => DocumentKind::Html,
            "application/pdf" => DocumentKind::Pdf,
            "application/json" | "application/xml" | "application/javascript" => {
                DocumentKind::PlainText
            }
            "application/octet-stream" | "" => DocumentKind::Binary,
            other if other.starts_with("text/") => DocumentKind::PlainText,
            _ => DocumentKind::Unsupported,
        }
    }
}

pub fn extract_text(bytes: &[u8], mime_type: &str) -> String {
    let kind = DocumentKind::from_mime(mime_type);
    debug!(mime_type, bytes = bytes.len(), ?kind, "Extracting text");
    match kind {
        DocumentKind::PlainText => String::from_utf8_lossy(bytes).trim().to_string(),
        DocumentKind::Html => strip_html(&String::from_utf8_lossy(bytes)),
        DocumentKind::Pdf => scrape_pdf(bytes),
        DocumentKind::Binary => match std::str::from_utf8(bytes) {
            Ok(text) => text.trim().to_string(),
            Err(_) => unsupported(mime_type, bytes.len()),
        },
        DocumentKind::Unsupported => unsupported(mime_type, bytes.len()),
    }
}

fn unsupported(mime_type: &str, len: usize) -> String {
    format!("[Unsupported document type {mime_type}, {len} bytes]")
}

fn strip_html(html: &str) -> String {
    let without_scripts = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_tags = HTML_TAG.replace_all(&without_scripts, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

fn scrape_pdf(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let mut pieces = Vec::new();
    for caps in PDF_SHOW_TEXT.captures_iter(&raw) {
        if let Some(single) = caps.get(1) {
            pieces.push(unescape_pdf(single.as_str()));
        } else if let Some(array) = caps.get(2) {
            let joined: String = PDF_STRING
                .captures_iter(array.as_str())
                .map(|inner| unescape_pdf(&inner[1]))
                .collect();
            pieces.push(joined);
        }
    }

    let text = pieces
        .iter()
        .map(|piece| piece.trim())
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        format!("[No extractable text in PDF, {} bytes]", bytes.len())
    } else {
        text
    }
}

fn unescape_pdf(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
