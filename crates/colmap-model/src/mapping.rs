//! Column mapping result types.
//!
//! A [`ColumnMappingResult`] partitions the source columns of one request:
//! every header position appears exactly once, either as a
//! [`CanonicalFieldMapping`] or as an [`ExtraColumnMapping`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Semantic role assigned to every column in table mode.
pub const TABLE_COLUMN_ROLE: &str = "table_column";

/// Semantic role given to a canonical field demoted for low confidence.
pub const DEMOTED_ROLE: &str = "low_confidence";

/// A source column mapped onto a canonical schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFieldMapping {
    pub canonical_name: String,
    pub source_header: String,
    /// 0-based position in the request headers.
    pub column_index: usize,
    /// Certainty in `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// A source column kept outside the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraColumnMapping {
    pub name: String,
    pub semantic_role: String,
    pub column_index: usize,
    pub confidence: f64,
}

/// Summary counters for a mapping result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingMeta {
    pub detected_type: String,
    pub source_language: String,
    pub total_columns: usize,
    pub mapped_columns: usize,
    pub unmapped_columns: usize,
    /// Mean confidence of the canonical fields, 0 when none are mapped.
    pub avg_confidence: f64,
}

/// Complete mapping of one request's columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMappingResult {
    pub canonical_fields: Vec<CanonicalFieldMapping>,
    pub extra_columns: Vec<ExtraColumnMapping>,
    pub meta: MappingMeta,
}

/// Mean confidence of the given canonical fields, 0 for an empty slice.
pub fn average_confidence(fields: &[CanonicalFieldMapping]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let sum: f64 = fields.iter().map(|f| f.confidence).sum();
    sum / fields.len() as f64
}

impl ColumnMappingResult {
    /// Total number of entries across both lists.
    pub fn entry_count(&self) -> usize {
        self.canonical_fields.len() + self.extra_columns.len()
    }

    /// Canonical names in result order.
    pub fn canonical_names(&self) -> Vec<&str> {
        self.canonical_fields
            .iter()
            .map(|f| f.canonical_name.as_str())
            .collect()
    }

    /// Recomputes mapped/unmapped counts and the average confidence.
    ///
    /// `total_columns` is left untouched.
    pub fn recompute_meta(&mut self) {
        self.meta.mapped_columns = self.canonical_fields.len();
        self.meta.unmapped_columns = self.extra_columns.len();
        self.meta.avg_confidence = average_confidence(&self.canonical_fields);
    }

    /// Returns the first column index claimed by two canonical fields.
    pub fn conflicting_canonical_index(&self) -> Option<usize> {
        let mut seen = BTreeSet::new();
        self.canonical_fields
            .iter()
            .map(|f| f.column_index)
            .find(|idx| !seen.insert(*idx))
    }

    /// Checks the range and partition invariants against `column_count` headers.
    ///
    /// Confidences must be finite and in `[0, 1]`, every index must reference a
    /// header, and every header position must appear exactly once.
    pub fn validate_shape(&self, column_count: usize) -> Result<()> {
        let mut seen = vec![false; column_count];
        let entries = self
            .canonical_fields
            .iter()
            .map(|f| (f.column_index, f.confidence))
            .chain(
                self.extra_columns
                    .iter()
                    .map(|e| (e.column_index, e.confidence)),
            );
        for (column_index, confidence) in entries {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ModelError::ConfidenceOutOfRange {
                    column_index,
                    value: confidence,
                });
            }
            let Some(slot) = seen.get_mut(column_index) else {
                return Err(ModelError::ColumnIndexOutOfBounds {
                    column_index,
                    column_count,
                });
            };
            if *slot {
                return Err(ModelError::DuplicateColumnIndex { column_index });
            }
            *slot = true;
        }
        if let Some(column_index) = seen.iter().position(|present| !present) {
            return Err(ModelError::MissingColumn { column_index });
        }
        Ok(())
    }
}
