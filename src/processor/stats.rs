//! Aggregate statistics over a document's processed links

use crate::config::TierPolicy;
use crate::schema::{LinkCategory, LinkStats, ProcessedLink};

/// Whether the tier policy subjects this category to a validation check.
///
/// Format checks (anchor, email, phone) and same-origin probes always run;
/// external probes are gated by the tier's `validate_external` flag.
#[must_use]
pub fn validation_enabled(category: LinkCategory, policy: &TierPolicy) -> bool {
    match category {
        LinkCategory::External => policy.validate_external,
        LinkCategory::Anchor
        | LinkCategory::Email
        | LinkCategory::Phone
        | LinkCategory::Internal
        | LinkCategory::Absolute
        | LinkCategory::Relative
        | LinkCategory::File => true,
    }
}

/// Tally per-category counts and validation outcomes.
///
/// `pending` counts records whose category skipped validation under the
/// policy; `valid`/`invalid` partition the validated remainder.
#[must_use]
pub fn compute(links: &[ProcessedLink], policy: &TierPolicy) -> LinkStats {
    let mut stats = LinkStats {
        total: links.len(),
        ..LinkStats::default()
    };

    for link in links {
        *stats
            .by_category
            .entry(link.category.as_str().to_string())
            .or_insert(0) += 1;

        match link.category {
            LinkCategory::External => stats.external += 1,
            LinkCategory::Internal | LinkCategory::Absolute | LinkCategory::Relative => {
                stats.internal += 1;
            }
            _ => {}
        }

        if validation_enabled(link.category, policy) {
            stats.validated += 1;
            if link.is_valid {
                stats.valid += 1;
            } else {
                stats.invalid += 1;
            }
        } else {
            stats.pending += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DifficultyTier;
    use crate::schema::{LinkMetadata, ProcessedLink};
    use chrono::Utc;

    fn link(url: &str, category: LinkCategory, is_valid: bool) -> ProcessedLink {
        ProcessedLink {
            original_url: url.to_string(),
            url: url.to_string(),
            display_text: url.to_string(),
            category,
            is_valid,
            metadata: LinkMetadata::default(),
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tallies_categories_and_outcomes() {
        let links = vec![
            link("https://ex.com/a", LinkCategory::External, true),
            link("/docs/a", LinkCategory::Absolute, true),
            link("#intro", LinkCategory::Anchor, false),
        ];
        let policy = TierPolicy::for_tier(DifficultyTier::Advanced);
        let stats = compute(&links, &policy);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.external, 1);
        assert_eq!(stats.internal, 1);
        assert_eq!(stats.by_category.get("anchor"), Some(&1));
        assert_eq!(stats.validated, 3);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn external_links_are_pending_when_tier_skips_external_probes() {
        let links = vec![link("https://ex.com/a", LinkCategory::External, true)];
        let policy = TierPolicy::for_tier(DifficultyTier::Basic);
        let stats = compute(&links, &policy);

        assert_eq!(stats.pending, 1);
        assert_eq!(stats.validated, 0);
    }
}
