//! Shared configuration constants for linkpipe
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default fast-tier cache capacity: 500 entries
///
/// Bounds memory for the in-process LRU tier. A typical document yields
/// 10-50 link records, so 500 entries covers a healthy working set of
/// recently viewed pages before least-recently-used eviction kicks in.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 500;

/// Default validation-result cache lifetime: 1 hour
///
/// Reachability rarely changes minute to minute; an hour keeps probe
/// traffic low without letting dead links linger as "valid" for long.
/// Failed results use the same lifetime so a failing target is not
/// hammered with re-probes.
pub const DEFAULT_VALIDATION_TTL_SECS: u64 = 3_600;

/// Default processed-link cache lifetime: 30 minutes
///
/// Processing results embed display text and rewrite rules which change
/// with configuration edits, so they expire faster than raw reachability.
pub const DEFAULT_PROCESSING_TTL_SECS: u64 = 1_800;

/// Default background sweep interval: 5 minutes
///
/// The sweeper deletes expired entries from both cache tiers independent
/// of read traffic, bounding slow-tier growth for keys nobody re-reads.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default probe timeout: 10 seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent sent with validation probes
pub const PROBE_USER_AGENT: &str = "linkpipe/0.1 (+link validation)";

/// Query parameter appended to file links that force a download
pub const DOWNLOAD_QUERY_FLAG: &str = "download=1";

/// Marker appended to the display text of external links
///
/// Enrichment is idempotent: transform never appends the marker twice.
pub const EXTERNAL_LINK_MARKER: &str = " ↗";

/// Default subject injected into `mailto:` links that carry none
pub const DEFAULT_EMAIL_SUBJECT: &str = "Hello";

/// Minimum digit count for a phone reference to be considered valid
pub const MIN_PHONE_DIGITS: usize = 7;

/// File extensions recognized as file links during classification
pub const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "tar", "gz", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "epub",
];

/// File extensions that get the forced-download query flag
pub const DOWNLOAD_EXTENSIONS: &[&str] = &["pdf", "zip", "tar", "gz", "epub"];
