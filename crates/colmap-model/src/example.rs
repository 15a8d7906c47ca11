//! Few-shot examples consumed by prompt builders.

use serde::{Deserialize, Serialize};

use crate::mapping::CanonicalFieldMapping;

/// Operation name for column mapping examples.
pub const COLUMN_MAPPING_OPERATION: &str = "column_mapping";

/// A worked (headers -> mapping) pair used to steer future mapping calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub operation: String,
    pub schema_type: String,
    pub language: String,
    pub headers: Vec<String>,
    pub mappings: Vec<CanonicalFieldMapping>,
    /// Where the example came from (e.g. "user_feedback").
    pub source: String,
}
