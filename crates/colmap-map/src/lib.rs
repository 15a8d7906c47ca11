//! Column mapping for tabular input without a fixed schema.
//!
//! - [`ModelRouter`] picks a simple or complex model before any call is made.
//! - [`NormalizedCache`] keys results by order-, case- and
//!   whitespace-insensitive header sets.
//! - [`ColumnMapper`] runs table mode deterministically and spec mode through
//!   an [`AiBackend`].
//! - The [`confidence`] module holds the review gate and the low-confidence
//!   fallback.

pub mod backend;
pub mod cache;
pub mod confidence;
pub mod error;
pub mod mapper;
pub mod router;

pub use backend::{AiBackend, AiMappingRequest, BackendError};
pub use cache::{
    BoundedCache, CacheKey, CacheStats, LruTtlCache, NormalizedCache, normalize_headers,
};
pub use confidence::{
    ConfidenceLevel, ConfidenceThresholds, apply_confidence_fallback, get_confidence_level,
    should_review_mapping,
};
pub use error::{ErrorCategory, MappingError, Result};
pub use mapper::{CachedMapping, ColumnMapper, MapOptions, MappingRun, table_mapping};
pub use router::{Escalation, ModelRouter, RoutingContext};
