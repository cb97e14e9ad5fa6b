//! Display-text synthesis and enrichment
//!
//! Empty display text is synthesized from the URL; non-empty text gets a
//! category-appropriate marker appended. Enrichment is idempotent so
//! re-transforming already-enriched text never duplicates markers.

use url::Url;

use crate::schema::LinkCategory;

/// Synthesize display text from a URL when the author supplied none
#[must_use]
pub fn synthesize(url: &str, category: LinkCategory) -> String {
    match category {
        LinkCategory::Email => strip_payload(url, "mailto:"),
        LinkCategory::Phone => strip_payload(url, "tel:"),
        LinkCategory::Anchor => url.trim_start_matches('#').to_string(),
        LinkCategory::File => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .rsplit('/')
            .next()
            .unwrap_or(url)
            .to_string(),
        _ => host_and_path(url),
    }
}

/// Append the category marker when missing; reapplication is a no-op
#[must_use]
pub fn enrich(text: &str, category: LinkCategory, external_marker: &str) -> String {
    match category {
        LinkCategory::External if !external_marker.is_empty() && !text.ends_with(external_marker) => {
            format!("{text}{external_marker}")
        }
        _ => text.to_string(),
    }
}

fn strip_payload(url: &str, scheme: &str) -> String {
    let payload = url
        .strip_prefix(scheme)
        .unwrap_or(url);
    payload.split('?').next().unwrap_or(payload).to_string()
}

fn host_and_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let path = parsed.path().trim_end_matches('/');
            if path.is_empty() {
                host.to_string()
            } else {
                format!("{host}{path}")
            }
        }
        // Relative references have no host to show
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_by_category() {
        assert_eq!(
            synthesize("https://example.com/docs/a", LinkCategory::External),
            "example.com/docs/a"
        );
        assert_eq!(
            synthesize("https://example.com/", LinkCategory::Internal),
            "example.com"
        );
        assert_eq!(
            synthesize("mailto:a@b.com?subject=Hi", LinkCategory::Email),
            "a@b.com"
        );
        assert_eq!(synthesize("tel:+1234567", LinkCategory::Phone), "+1234567");
        assert_eq!(synthesize("#intro", LinkCategory::Anchor), "intro");
        assert_eq!(
            synthesize("/files/guide.pdf?download=1", LinkCategory::File),
            "guide.pdf"
        );
    }

    #[test]
    fn enrichment_is_idempotent() {
        let once = enrich("Docs", LinkCategory::External, " ↗");
        assert_eq!(once, "Docs ↗");
        let twice = enrich(&once, LinkCategory::External, " ↗");
        assert_eq!(twice, once);
        // Non-external categories are untouched
        assert_eq!(enrich("Docs", LinkCategory::Internal, " ↗"), "Docs");
    }
}
