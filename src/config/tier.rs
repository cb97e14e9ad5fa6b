//! Difficulty tiers and their processing policies
//!
//! Documents arrive with a difficulty tier; the tier decides how aggressive
//! the pipeline is allowed to be: concurrency caps, cache lifetimes, probe
//! timeouts, and whether bare-URL deep detection and external validation
//! are enabled at all.

use serde::{Deserialize, Serialize};

/// Content difficulty tier supplied with each document context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl DifficultyTier {
    /// Stable lowercase name used in cache keys and log output
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Parse a tier name, case-insensitive
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier processing policy.
///
/// Higher tiers allow more concurrent validations and longer cache
/// lifetimes; deep link detection (scanning for bare URLs in prose) is
/// only enabled where the tier opts in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Concurrency cap for validation probes issued for one document
    pub max_concurrent_validations: usize,
    /// Chunk length for batch processing
    pub batch_size: usize,
    /// Pause inserted after each successful chunk, in milliseconds
    pub batch_delay_ms: u64,
    /// Per-probe timeout in seconds
    pub request_timeout_secs: u64,
    /// Cache lifetime for validation results, in seconds
    pub validation_ttl_secs: u64,
    /// Cache lifetime for processed link collections, in seconds
    pub processing_ttl_secs: u64,
    /// Scan prose for bare scheme-qualified URLs during extraction
    pub deep_link_detection: bool,
    /// Issue network probes for external links
    pub validate_external: bool,
}

impl TierPolicy {
    /// Built-in policy table for the three tiers
    #[must_use]
    pub fn for_tier(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Basic => Self {
                max_concurrent_validations: 2,
                batch_size: 5,
                batch_delay_ms: 200,
                request_timeout_secs: 5,
                validation_ttl_secs: 1_800,
                processing_ttl_secs: 900,
                deep_link_detection: false,
                validate_external: false,
            },
            DifficultyTier::Intermediate => Self {
                max_concurrent_validations: 4,
                batch_size: 10,
                batch_delay_ms: 100,
                request_timeout_secs: 8,
                validation_ttl_secs: 3_600,
                processing_ttl_secs: 1_800,
                deep_link_detection: false,
                validate_external: true,
            },
            DifficultyTier::Advanced => Self {
                max_concurrent_validations: 8,
                batch_size: 20,
                batch_delay_ms: 50,
                request_timeout_secs: 10,
                validation_ttl_secs: 7_200,
                processing_ttl_secs: 3_600,
                deep_link_detection: true,
                validate_external: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parse_roundtrip() {
        for tier in [
            DifficultyTier::Basic,
            DifficultyTier::Intermediate,
            DifficultyTier::Advanced,
        ] {
            assert_eq!(DifficultyTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(DifficultyTier::parse("ADVANCED"), Some(DifficultyTier::Advanced));
        assert_eq!(DifficultyTier::parse("expert"), None);
    }

    #[test]
    fn policies_scale_with_tier() {
        let basic = TierPolicy::for_tier(DifficultyTier::Basic);
        let advanced = TierPolicy::for_tier(DifficultyTier::Advanced);
        assert!(advanced.max_concurrent_validations > basic.max_concurrent_validations);
        assert!(advanced.validation_ttl_secs > basic.validation_ttl_secs);
        assert!(advanced.deep_link_detection);
        assert!(!basic.deep_link_detection);
    }
}
