//! Semantic checks on a mapping result.
//!
//! ## Rules
//!
//! - Two canonical fields claiming one column → **Error**, overall `poor`
//! - Average canonical confidence below 0.60 → **Warning**
//! - Required schema field not mapped → **Warning**
//! - Required field mapped below the required-field confidence → **Info**
//!
//! Warnings make the overall verdict `needs_improvement`. Info issues do not
//! affect it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use colmap_map::ConfidenceThresholds;
use colmap_model::{ColumnMappingResult, average_confidence};
use colmap_standards::SchemaType;
use serde::Serialize;
use tracing::debug;

/// Average confidence below which a mapping needs improvement.
pub const LOW_AVERAGE_CONFIDENCE: f64 = 0.60;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Overall verdict for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    Good,
    NeedsImprovement,
    Poor,
}

impl Overall {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::NeedsImprovement => "needs_improvement",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: String,
    /// Canonical field concerned, if any.
    pub field: Option<String>,
    pub column_index: Option<usize>,
    pub message: String,
}

/// Semantic validation report for one mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticReport {
    pub schema: String,
    pub overall: Overall,
    pub issues: Vec<Issue>,
}

impl SemanticReport {
    pub fn is_good(&self) -> bool {
        self.overall == Overall::Good
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }
}

/// Validates `result` against the canonical schema named `schema_name`.
///
/// Unknown schema names are checked against the generic schema.
pub fn validate_mapping_semantics(result: &ColumnMappingResult, schema_name: &str) -> SemanticReport {
    let schema = SchemaType::from_name(schema_name);
    let mut issues = Vec::new();

    issues.extend(check_conflicts(result));
    issues.extend(check_average(result));
    issues.extend(check_required(result, schema));

    let overall = if issues.iter().any(|i| i.severity == Severity::Error) {
        Overall::Poor
    } else if issues.iter().any(|i| i.severity == Severity::Warning) {
        Overall::NeedsImprovement
    } else {
        Overall::Good
    };
    debug!(schema = %schema, %overall, issues = issues.len(), "semantic validation");

    SemanticReport {
        schema: schema.as_str().to_string(),
        overall,
        issues,
    }
}

fn check_conflicts(result: &ColumnMappingResult) -> Vec<Issue> {
    let mut by_index: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for field in &result.canonical_fields {
        by_index
            .entry(field.column_index)
            .or_default()
            .push(&field.canonical_name);
    }
    by_index
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(column_index, names)| Issue {
            severity: Severity::Error,
            category: "conflicting_column".to_string(),
            field: None,
            column_index: Some(column_index),
            message: format!(
                "column {column_index} is claimed by several canonical fields: {}",
                names.join(", ")
            ),
        })
        .collect()
}

fn check_average(result: &ColumnMappingResult) -> Option<Issue> {
    let avg = average_confidence(&result.canonical_fields);
    (avg < LOW_AVERAGE_CONFIDENCE).then(|| Issue {
        severity: Severity::Warning,
        category: "low_confidence".to_string(),
        field: None,
        column_index: None,
        message: format!("average confidence {avg:.2} is below {LOW_AVERAGE_CONFIDENCE:.2}"),
    })
}

fn check_required(result: &ColumnMappingResult, schema: SchemaType) -> Vec<Issue> {
    let mapped: BTreeSet<String> = result
        .canonical_fields
        .iter()
        .map(|f| f.canonical_name.trim().to_lowercase())
        .collect();
    let threshold = ConfidenceThresholds::DEFAULT.required_field_mapping;

    let mut issues = Vec::new();
    for required in schema.required_fields() {
        if !mapped.contains(*required) {
            issues.push(Issue {
                severity: Severity::Warning,
                category: "missing_required_field".to_string(),
                field: Some((*required).to_string()),
                column_index: None,
                message: format!("required field '{required}' is not mapped"),
            });
            continue;
        }
        let weak = result.canonical_fields.iter().find(|f| {
            f.canonical_name.trim().eq_ignore_ascii_case(required) && f.confidence < threshold
        });
        if let Some(field) = weak {
            issues.push(Issue {
                severity: Severity::Info,
                category: "weak_required_field".to_string(),
                field: Some((*required).to_string()),
                column_index: Some(field.column_index),
                message: format!(
                    "required field '{required}' mapped from '{}' with confidence {:.2}",
                    field.source_header, field.confidence
                ),
            });
        }
    }
    issues
}
