//! Public error taxonomy for the pipeline
//!
//! Internal plumbing stays on `anyhow`; this enum is the typed surface
//! callers can match on. Batch errors convert losslessly. Slow-tier cache
//! failures surface here through the `try_` write methods on
//! `CacheManager` and are downgraded to warnings by the fire-and-forget
//! variants.

use crate::batch::BatchError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A rewrite rule could not make sense of its input
    #[error("transform failed for '{url}': {reason}")]
    Transform { url: String, reason: String },

    /// The validation layer could not be set up or run
    #[error("validation failed: {0}")]
    Validation(String),

    /// Batch executor errors pass through unchanged
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// A slow-tier cache operation failed
    #[error("cache operation failed: {0}")]
    Cache(String),

    /// The caller violated an API contract
    #[error("invalid usage: {0}")]
    Misuse(String),
}
