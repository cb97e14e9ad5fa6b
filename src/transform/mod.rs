//! Pure, stateless link transformation
//!
//! Classification, per-category URL rewriting, and display-text
//! enrichment. No network access, no shared-state mutation; malformed
//! input degrades to pass-through with a logged warning and never raises.

pub mod classify;
pub mod display;
pub mod rewrite;

pub use classify::classify;

use std::sync::Arc;

use log::warn;

use crate::config::{DifficultyTier, PipelineConfig};
use crate::schema::{DocumentContext, LinkCategory, LinkMetadata, ProcessedLink};

/// Stateless transformer configured with the site's rewrite rules
#[derive(Clone)]
pub struct LinkTransformer {
    config: Arc<PipelineConfig>,
}

impl LinkTransformer {
    #[must_use]
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Classify and rewrite one reference, producing an unvalidated record.
    ///
    /// The returned record carries `is_valid = true`; reachability is the
    /// validator's concern and orthogonal to rewriting.
    #[must_use]
    pub fn transform(
        &self,
        raw_url: &str,
        display_text: &str,
        context: &DocumentContext,
    ) -> ProcessedLink {
        let category = classify(raw_url, self.config.base_host(), self.config.file_extensions());

        let rewritten = match category {
            LinkCategory::Relative => rewrite::rewrite_relative(raw_url, &self.config, context),
            LinkCategory::Absolute => rewrite::rewrite_absolute(raw_url, &self.config),
            LinkCategory::Internal => rewrite::rewrite_internal(raw_url),
            LinkCategory::External => rewrite::rewrite_external(raw_url, &self.config),
            LinkCategory::Anchor => rewrite::rewrite_anchor(raw_url),
            LinkCategory::Email => rewrite::rewrite_email(raw_url, &self.config),
            LinkCategory::Phone => rewrite::rewrite_phone(raw_url),
            LinkCategory::File => {
                let extension =
                    classify::file_extension(raw_url, self.config.file_extensions())
                        .unwrap_or_default();
                rewrite::rewrite_file(raw_url, &extension, &self.config)
            }
        };

        if rewritten.degraded {
            warn!(
                target: "linkpipe::transform",
                "Malformed {category} reference '{raw_url}', passing through unchanged"
            );
        }

        let mut metadata = self.build_metadata(raw_url, &rewritten.url, category);
        if rewritten.unresolved_fragment {
            metadata
                .attributes
                .insert("unresolved_fragment".to_string(), "true".to_string());
        }

        let text = if display_text.trim().is_empty() {
            display::synthesize(&rewritten.url, category)
        } else {
            display_text.to_string()
        };
        let display_text = display::enrich(&text, category, self.config.external_marker());

        ProcessedLink {
            original_url: raw_url.to_string(),
            url: rewritten.url,
            display_text,
            category,
            is_valid: true,
            metadata,
            error: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn build_metadata(&self, raw_url: &str, url: &str, category: LinkCategory) -> LinkMetadata {
        let mut metadata = LinkMetadata::default();
        match category {
            LinkCategory::File => {
                metadata.file_type =
                    classify::file_extension(raw_url, self.config.file_extensions());
                metadata.download = url.contains(crate::utils::constants::DOWNLOAD_QUERY_FLAG);
            }
            LinkCategory::Internal | LinkCategory::Absolute | LinkCategory::Relative => {
                metadata.difficulty_hint = difficulty_hint(url);
            }
            _ => {}
        }
        metadata
    }
}

/// Difficulty hint for internal links whose first path segment names a tier
fn difficulty_hint(url: &str) -> Option<DifficultyTier> {
    let parsed = url::Url::parse(url).ok()?;
    let first_segment = parsed.path_segments()?.next()?;
    DifficultyTier::parse(first_segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer() -> LinkTransformer {
        let config = PipelineConfig::builder()
            .base_url("https://example.com")
            .build()
            .expect("config");
        LinkTransformer::new(Arc::new(config))
    }

    fn context() -> DocumentContext {
        DocumentContext::new("/docs/page", DifficultyTier::Basic)
    }

    #[test]
    fn transform_is_idempotent_on_display_text() {
        let transformer = transformer();
        let context = context();
        let first = transformer.transform("https://other.com/a", "Docs", &context);
        let second = transformer.transform("https://other.com/a", &first.display_text, &context);
        assert_eq!(first.display_text, second.display_text);
    }

    #[test]
    fn file_metadata_consistency() {
        let transformer = transformer();
        let link = transformer.transform("guide.pdf", "", &context());
        assert_eq!(link.category, LinkCategory::File);
        assert_eq!(link.metadata.file_type.as_deref(), Some("pdf"));
        assert!(link.metadata.download);
        assert_eq!(link.display_text, "guide.pdf");

        // Anchor records never carry file metadata
        let anchor = transformer.transform("#intro", "", &context());
        assert!(anchor.metadata.file_type.is_none());
        assert!(!anchor.metadata.download);
    }

    #[test]
    fn difficulty_hint_from_path() {
        let transformer = transformer();
        let link = transformer.transform("/advanced/recursion", "", &context());
        assert_eq!(link.metadata.difficulty_hint, Some(DifficultyTier::Advanced));
        let plain = transformer.transform("/docs/intro", "", &context());
        assert_eq!(plain.metadata.difficulty_hint, None);
    }

    #[test]
    fn malformed_input_never_panics() {
        let transformer = transformer();
        let context = context();
        for raw in ["mailto:", "tel:", "#", "http://", "///", ""] {
            let link = transformer.transform(raw, "", &context);
            assert_eq!(link.original_url, raw);
        }
    }
}
