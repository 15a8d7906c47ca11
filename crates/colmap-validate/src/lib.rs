//! Semantic validation of column mapping results.

mod validator;

pub use validator::{
    Issue, LOW_AVERAGE_CONFIDENCE, Overall, SemanticReport, Severity, validate_mapping_semantics,
};
