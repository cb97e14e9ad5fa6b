//! Reference extraction from document text.
//!
//! Three shapes are recognized: markdown `[text](target)` references,
//! HTML anchor tags, and (when the tier enables deep detection) bare
//! scheme-qualified URLs in prose. Results keep source order and are
//! deduplicated by target.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::is_safe_scheme;

/// `[text](target)` markdown reference
static MARKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").unwrap_or_else(|e| panic!("markdown regex: {e}"))
});

/// `<a ... href="target" ...>text</a>` anchor tag
static ANCHOR_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .unwrap_or_else(|e| panic!("anchor tag regex: {e}"))
});

/// Bare scheme-qualified URL in prose, used only under deep detection
static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"')\]]+"#).unwrap_or_else(|e| panic!("bare url regex: {e}"))
});

/// Strips nested markup from anchor tag inner text
static TAG_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("tag strip regex: {e}")));

/// One reference found in document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Target exactly as written in the source
    pub url: String,
    /// Source display text, empty when the shape carries none
    pub text: String,
    /// Byte offset of the reference in the document
    pub position: usize,
}

/// Scan document text for link references.
///
/// Order follows first appearance in the source; a target seen more than
/// once (in any shape) is reported once. Targets with script, data, or
/// blob execution schemes are dropped.
#[must_use]
pub fn extract_links(content: &str, deep_detection: bool) -> Vec<ExtractedLink> {
    let mut found: Vec<ExtractedLink> = Vec::new();

    for caps in MARKDOWN_RE.captures_iter(content) {
        if let (Some(whole), Some(text), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) {
            found.push(ExtractedLink {
                url: url.as_str().to_string(),
                text: text.as_str().to_string(),
                position: whole.start(),
            });
        }
    }

    for caps in ANCHOR_TAG_RE.captures_iter(content) {
        if let (Some(whole), Some(url), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2)) {
            let text = TAG_STRIP_RE.replace_all(inner.as_str(), "").trim().to_string();
            found.push(ExtractedLink {
                url: url.as_str().to_string(),
                text,
                position: whole.start(),
            });
        }
    }

    if deep_detection {
        for m in BARE_URL_RE.find_iter(content) {
            found.push(ExtractedLink {
                url: trim_trailing_punctuation(m.as_str()).to_string(),
                text: String::new(),
                position: m.start(),
            });
        }
    }

    found.sort_by_key(|link| link.position);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|link| is_safe_scheme(&link.url))
        .filter(|link| !link.url.is_empty())
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Sentence punctuation glued to the end of a bare URL is not part of it
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}
