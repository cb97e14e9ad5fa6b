//! Core data records shared across the pipeline.
//!
//! This module contains the fundamental types produced and consumed by the
//! link pipeline: processed link records, validation results, the caller
//! supplied document context, and aggregate statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::tier::DifficultyTier;

/// Category assigned to a reference during classification.
///
/// Exactly one category applies to each link record; the category decides
/// which transform and validation rules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkCategory {
    /// Scheme-qualified URL on a foreign host
    External,
    /// Scheme-qualified URL on the site's own host
    Internal,
    /// Fragment-only reference (`#section`)
    Anchor,
    /// Explicit relative path (`./`, `../`) or bare relative reference
    Relative,
    /// Root-relative path (`/docs/...`)
    Absolute,
    /// `mailto:` reference
    Email,
    /// `tel:` reference
    Phone,
    /// Reference to a downloadable file, matched by extension
    File,
}

impl LinkCategory {
    /// Stable lowercase name used for stats keys and log output
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
            Self::Anchor => "anchor",
            Self::Relative => "relative",
            Self::Absolute => "absolute",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific metadata attached to a processed link.
///
/// Invariant: metadata is consistent with the record's category once the
/// record is marked valid (an anchor record never carries a file type).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Human-readable title, when one could be derived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Difficulty hint for internal links pointing at tiered content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_hint: Option<DifficultyTier>,
    /// File extension for file links (`pdf`, `zip`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Whether the link should be served as a forced download
    #[serde(default)]
    pub download: bool,
    /// Free-form attributes set by transform rules
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

/// A fully processed link record for one reference in a document.
///
/// Identity is the original reference string; records are immutable after
/// creation and only superseded by a newer cache write for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedLink {
    /// The reference string exactly as it appeared in the source text
    pub original_url: String,
    /// Rewritten URL used for rendering
    pub url: String,
    /// Display text, synthesized or enriched from the source text
    pub display_text: String,
    /// Classified category
    pub category: LinkCategory,
    /// Whether the link passed (or skipped) validation
    pub is_valid: bool,
    /// Category-specific metadata
    #[serde(default)]
    pub metadata: LinkMetadata,
    /// Error message when processing or validation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ProcessedLink {
    /// Build a minimal record for a reference that could not be processed.
    ///
    /// The orchestrator never lets one bad link abort a document; failures
    /// degrade to an invalid record carrying the error string.
    #[must_use]
    pub fn failed(original_url: &str, display_text: &str, error: String) -> Self {
        Self {
            original_url: original_url.to_string(),
            url: original_url.to_string(),
            display_text: if display_text.is_empty() {
                original_url.to_string()
            } else {
                display_text.to_string()
            },
            category: LinkCategory::Relative,
            is_valid: false,
            metadata: LinkMetadata::default(),
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}

/// Caller-supplied description of the document being processed.
///
/// The pipeline never mutates the context; it derives cache keys from it
/// and consults the difficulty tier to pick a processing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Site-relative path of the document (`/docs/setup`)
    pub path: String,
    /// Difficulty tier controlling validation and caching policy
    pub difficulty: DifficultyTier,
    /// Document title
    pub title: String,
    /// Document language code (`en`, `de`, ...)
    pub language: String,
    /// Optional content category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Optional last-modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Free-form metadata supplied by the caller
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl DocumentContext {
    /// Minimal context for a path at the given tier
    #[must_use]
    pub fn new(path: impl Into<String>, difficulty: DifficultyTier) -> Self {
        Self {
            path: path.into(),
            difficulty,
            title: String::new(),
            language: "en".to_string(),
            category: None,
            author: None,
            last_modified: None,
            metadata: HashMap::new(),
        }
    }

    /// Cache key for a single link processed under this context.
    ///
    /// Keyed by (difficulty, document path, url) so the same URL processed
    /// under a different tier or page gets its own cache entry.
    #[must_use]
    pub fn link_cache_key(&self, url: &str) -> String {
        format!("{}:{}:{}", self.difficulty.as_str(), self.path, url)
    }
}

/// Outcome of one reachability or format check for a URL.
///
/// Cached per URL, independent of the owning document. `validated_at` is
/// refreshed on every re-validation and never rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the target is considered reachable / well-formed
    pub is_valid: bool,
    /// HTTP status when a probe was issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Probe round-trip time in milliseconds
    pub response_time_ms: u64,
    /// Final URL when the probe was redirected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Error description for failed checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the check completed
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Successful result with an optional status code
    #[must_use]
    pub fn valid(status: Option<u16>, response_time_ms: u64) -> Self {
        Self {
            is_valid: true,
            status,
            response_time_ms,
            redirect_url: None,
            error: None,
            validated_at: Utc::now(),
        }
    }

    /// Failed result with an error description
    #[must_use]
    pub fn invalid(status: Option<u16>, response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            status,
            response_time_ms,
            redirect_url: None,
            error: Some(error.into()),
            validated_at: Utc::now(),
        }
    }
}

/// Aggregate link statistics for one processed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub total: usize,
    /// Count per category, keyed by `LinkCategory::as_str`
    pub by_category: HashMap<String, usize>,
    /// Records that went through a validation check
    pub validated: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Records whose category skipped validation under the tier policy
    pub pending: usize,
    pub external: usize,
    pub internal: usize,
}
