//! Adaptive column mapping pipeline.
//!
//! Ties together the format detector, column mapper, confidence evaluator and
//! semantic validator, configured from TOML.

pub mod config;
pub mod pipeline;

pub use config::{
    CacheSettings, ColmapConfig, ConfigError, ExampleSettings, FeedbackSettings, MappingSettings,
    RouterSettings,
};
pub use pipeline::{MappingOutcome, MappingPipeline, QuickAcceptance};
