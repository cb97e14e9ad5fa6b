//! Configuration module for the link pipeline
//!
//! This module provides the `PipelineConfig` struct and its type-safe
//! builder for configuring link processing with validation and sensible
//! defaults, plus the difficulty-tier policy table.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod tier;
pub mod types;

// Re-exports for public API
pub use builder::{PipelineConfigBuilder, WithBaseUrl};
pub use tier::{DifficultyTier, TierPolicy};
pub use types::PipelineConfig;
