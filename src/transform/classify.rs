//! Reference classification
//!
//! First-match-wins precedence: anchor → email → phone → scheme-qualified
//! (split into internal/external by host) → root-relative → explicit
//! relative → file extension → default relative.

use crate::schema::LinkCategory;
use crate::utils::url_utils::{extract_host, same_host};

/// Classify a raw reference string.
///
/// `base_host` is the normalized host of the site origin; scheme-qualified
/// URLs on that host classify as Internal, everything else as External.
#[must_use]
pub fn classify(raw: &str, base_host: &str, file_extensions: &[String]) -> LinkCategory {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    if trimmed.starts_with('#') {
        return LinkCategory::Anchor;
    }
    if lower.starts_with("mailto:") {
        return LinkCategory::Email;
    }
    if lower.starts_with("tel:") {
        return LinkCategory::Phone;
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return match extract_host(trimmed) {
            Some(host) if same_host(&host, base_host) => LinkCategory::Internal,
            _ => LinkCategory::External,
        };
    }
    if trimmed.starts_with('/') {
        return LinkCategory::Absolute;
    }
    if trimmed.starts_with("./") || trimmed.starts_with("../") {
        return LinkCategory::Relative;
    }
    if file_extension(trimmed, file_extensions).is_some() {
        return LinkCategory::File;
    }
    LinkCategory::Relative
}

/// Extension of the reference if it is on the allow-list (query and
/// fragment stripped first)
#[must_use]
pub fn file_extension(reference: &str, file_extensions: &[String]) -> Option<String> {
    let path = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    let (_, ext) = path.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if ext.is_empty() || ext.contains('/') {
        return None;
    }
    file_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        .then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        crate::utils::constants::FILE_EXTENSIONS
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn classification_boundary_table() {
        let exts = exts();
        let classify = |raw: &str| classify(raw, "example.com", &exts);

        assert_eq!(classify("#intro"), LinkCategory::Anchor);
        assert_eq!(classify("mailto:a@b.com"), LinkCategory::Email);
        assert_eq!(classify("tel:+1234567"), LinkCategory::Phone);
        assert_eq!(classify("https://other.com/x"), LinkCategory::External);
        assert_eq!(classify("https://example.com/x"), LinkCategory::Internal);
        assert_eq!(classify("https://www.example.com/x"), LinkCategory::Internal);
        assert_eq!(classify("/docs/a"), LinkCategory::Absolute);
        assert_eq!(classify("./img.png"), LinkCategory::Relative);
        assert_eq!(classify("../up.md"), LinkCategory::Relative);
        assert_eq!(classify("handbook.pdf"), LinkCategory::File);
        assert_eq!(classify("page"), LinkCategory::Relative);
    }

    #[test]
    fn file_extension_ignores_query_and_fragment() {
        let exts = exts();
        assert_eq!(file_extension("doc.pdf?v=2", &exts), Some("pdf".into()));
        assert_eq!(file_extension("doc.PDF#page=3", &exts), Some("pdf".into()));
        assert_eq!(file_extension("doc.html", &exts), None);
        assert_eq!(file_extension("noext", &exts), None);
    }
}
