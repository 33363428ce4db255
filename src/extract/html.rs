//! HTML text extraction.

use std::path::Path;

use scraper::{Html, Node};

use super::plain::decode_bytes;
use super::{ExtractError, TextExtractor};

/// Extractor for HTML documents.
///
/// Collects visible text nodes, skipping script, style, and noscript
/// contents, and collapses runs of whitespace.
pub struct HtmlExtractor;

impl TextExtractor for HtmlExtractor {
    fn name(&self) -> &'static str {
        "html"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/html", "application/xhtml+xml"]
    }

    fn extract(
        &self,
        path: &Path,
        _content_type: &str,
        encoding: Option<&str>,
    ) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        let source = decode_bytes(&bytes, encoding);
        Ok(visible_text(&source))
    }
}

fn visible_text(source: &str) -> String {
    let document = Html::parse_document(source);
    let mut chunks: Vec<String> = Vec::new();

    for node in document.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.parent().is_some_and(|parent| match parent.value() {
            Node::Element(el) => matches!(el.name(), "script" | "style" | "noscript"),
            _ => false,
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }

    let joined = chunks.join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
