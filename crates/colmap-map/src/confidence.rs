//! Confidence evaluation: level buckets, the review gate and fallback.

use colmap_model::{ColumnMappingResult, DEMOTED_ROLE, ExtraColumnMapping};
use serde::Serialize;
use tracing::debug;

/// Canonical fields below this confidence are demoted to extra columns.
pub const FALLBACK_CONFIDENCE: f64 = 0.40;

/// Largest unmapped share of columns that passes the review gate.
pub const MAX_UNMAPPED_RATIO: f64 = 0.40;

/// Confidence level categories for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Returns a human-readable description of the confidence level.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Process-wide confidence thresholds.
///
/// Mapping confidences are on a `[0, 1]` scale. `header` is the 0-100 header
/// row score from header detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for [`ConfidenceLevel::High`] (0.80).
    pub high: f64,
    /// Minimum confidence for [`ConfidenceLevel::Medium`] (0.65).
    pub medium: f64,
    /// Confidence below which a single mapping is considered weak (0.55).
    pub low: f64,
    /// Minimum header row score (70).
    pub header: u8,
    /// Minimum confidence for a required field to count as mapped (0.50).
    pub required_field_mapping: f64,
}

impl ConfidenceThresholds {
    pub const DEFAULT: Self = Self {
        high: 0.80,
        medium: 0.65,
        low: 0.55,
        header: 70,
        required_field_mapping: 0.50,
    };

    /// Categorizes a confidence score.
    #[must_use]
    pub fn categorize(&self, confidence: f64) -> ConfidenceLevel {
        if confidence >= self.high {
            ConfidenceLevel::High
        } else if confidence >= self.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// The review gate. Returns true when a human must confirm the mapping.
    ///
    /// An empty mapping (`total_columns == 0`) always requires review.
    #[must_use]
    pub fn should_review(
        &self,
        avg_confidence: f64,
        header_confidence: u8,
        unmapped_count: usize,
        total_columns: usize,
    ) -> bool {
        if total_columns == 0 {
            return true;
        }
        let unmapped_ratio = unmapped_count as f64 / total_columns as f64;
        avg_confidence < self.medium
            || header_confidence < self.header
            || unmapped_ratio > MAX_UNMAPPED_RATIO
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Level for a confidence score under the default thresholds.
pub fn get_confidence_level(confidence: f64) -> ConfidenceLevel {
    ConfidenceThresholds::DEFAULT.categorize(confidence)
}

/// Review gate under the default thresholds.
pub fn should_review_mapping(
    avg_confidence: f64,
    header_confidence: u8,
    unmapped_count: usize,
    total_columns: usize,
) -> bool {
    ConfidenceThresholds::DEFAULT.should_review(
        avg_confidence,
        header_confidence,
        unmapped_count,
        total_columns,
    )
}

/// Demotes canonical fields with confidence below [`FALLBACK_CONFIDENCE`] to
/// extra columns and recomputes the derived counters.
///
/// The total entry count is unchanged; entries are moved, never dropped.
pub fn apply_confidence_fallback(mut result: ColumnMappingResult) -> ColumnMappingResult {
    let (kept, demoted): (Vec<_>, Vec<_>) = result
        .canonical_fields
        .into_iter()
        .partition(|field| field.confidence >= FALLBACK_CONFIDENCE);
    result.canonical_fields = kept;

    if !demoted.is_empty() {
        debug!(
            demoted = demoted.len(),
            fields = ?demoted.iter().map(|f| f.canonical_name.as_str()).collect::<Vec<_>>(),
            "demoting low-confidence canonical fields"
        );
        result
            .extra_columns
            .extend(demoted.into_iter().map(|field| ExtraColumnMapping {
                name: field.source_header,
                semantic_role: DEMOTED_ROLE.to_string(),
                column_index: field.column_index,
                confidence: field.confidence,
            }));
        result.extra_columns.sort_by_key(|extra| extra.column_index);
    }

    result.recompute_meta();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use colmap_model::{CanonicalFieldMapping, MappingMeta};

    fn field(name: &str, idx: usize, confidence: f64) -> CanonicalFieldMapping {
        CanonicalFieldMapping {
            canonical_name: name.to_string(),
            source_header: format!("{name} header"),
            column_index: idx,
            confidence,
            reasoning: String::new(),
        }
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(get_confidence_level(0.80), ConfidenceLevel::High);
        assert_eq!(get_confidence_level(0.99), ConfidenceLevel::High);
        assert_eq!(get_confidence_level(0.65), ConfidenceLevel::Medium);
        assert_eq!(get_confidence_level(0.79), ConfidenceLevel::Medium);
        assert_eq!(get_confidence_level(0.64), ConfidenceLevel::Low);
        assert_eq!(get_confidence_level(0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn review_gate_cases() {
        assert!(!should_review_mapping(0.85, 90, 0, 5));
        assert!(should_review_mapping(0.55, 85, 1, 5));
        assert!(should_review_mapping(0.80, 60, 0, 5));
        assert!(should_review_mapping(0.75, 85, 3, 5));
    }

    #[test]
    fn review_gate_boundaries() {
        // 2 of 5 unmapped is exactly 40%, which passes.
        assert!(!should_review_mapping(0.65, 70, 2, 5));
        assert!(should_review_mapping(0.95, 100, 0, 0));
    }

    #[test]
    fn fallback_demotes_weak_fields() {
        let result = ColumnMappingResult {
            canonical_fields: vec![field("id", 0, 0.95), field("title", 1, 0.2)],
            extra_columns: vec![ExtraColumnMapping {
                name: "misc".into(),
                semantic_role: "note".into(),
                column_index: 2,
                confidence: 0.5,
            }],
            meta: MappingMeta {
                total_columns: 3,
                mapped_columns: 2,
                unmapped_columns: 1,
                avg_confidence: 0.575,
                ..MappingMeta::default()
            },
        };
        let result = apply_confidence_fallback(result);
        assert_eq!(result.canonical_names(), ["id"]);
        assert_eq!(result.extra_columns.len(), 2);
        let demoted = &result.extra_columns[0];
        assert_eq!(demoted.column_index, 1);
        assert_eq!(demoted.name, "title header");
        assert_eq!(demoted.semantic_role, DEMOTED_ROLE);
        assert_eq!(result.meta.total_columns, 3);
        assert_eq!(result.meta.mapped_columns, 1);
        assert_eq!(result.meta.unmapped_columns, 2);
        assert!((result.meta.avg_confidence - 0.95).abs() < 1e-9);
        assert!(result.validate_shape(3).is_ok());
    }

    #[test]
    fn fallback_keeps_boundary_confidence() {
        let result = ColumnMappingResult {
            canonical_fields: vec![field("id", 0, FALLBACK_CONFIDENCE)],
            ..ColumnMappingResult::default()
        };
        let result = apply_confidence_fallback(result);
        assert_eq!(result.canonical_fields.len(), 1);
        assert!(result.extra_columns.is_empty());
    }
}
