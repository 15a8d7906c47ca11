//! Data model for adaptive column-to-schema mapping.
//!
//! Types shared by the detector, mapper, validator and feedback crates.

pub mod error;
pub mod example;
pub mod feedback;
pub mod mapping;
pub mod request;

pub use error::{ModelError, Result};
pub use example::{COLUMN_MAPPING_OPERATION, Example};
pub use feedback::{
    ColumnCorrection, CorrectionFrequency, Feedback, FeedbackPattern, FeedbackStats,
    PatternKind, PatternSeverity, Rating, Trend,
};
pub use mapping::{
    CanonicalFieldMapping, ColumnMappingResult, DEMOTED_ROLE, ExtraColumnMapping, MappingMeta,
    TABLE_COLUMN_ROLE, average_confidence,
};
pub use request::{MapColumnsRequest, MappingFormat};
