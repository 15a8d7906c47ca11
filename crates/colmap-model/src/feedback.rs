//! Feedback types recorded when users review a delivered mapping.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Binary user rating. Only 1 (thumbs-down) and 5 (thumbs-up) exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rating {
    ThumbsDown,
    ThumbsUp,
}

impl Rating {
    pub const fn value(self) -> i32 {
        match self {
            Self::ThumbsDown => 1,
            Self::ThumbsUp => 5,
        }
    }

    pub const fn is_positive(self) -> bool {
        matches!(self, Self::ThumbsUp)
    }
}

impl TryFrom<i32> for Rating {
    type Error = ModelError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ThumbsDown),
            5 => Ok(Self::ThumbsUp),
            other => Err(ModelError::InvalidRating(other)),
        }
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

/// A single column fix supplied with a rating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnCorrection {
    pub source_header: String,
    pub wrong_mapping: String,
    pub correct_mapping: String,
}

impl ColumnCorrection {
    pub fn new(
        source_header: impl Into<String>,
        wrong_mapping: impl Into<String>,
        correct_mapping: impl Into<String>,
    ) -> Self {
        Self {
            source_header: source_header.into(),
            wrong_mapping: wrong_mapping.into(),
            correct_mapping: correct_mapping.into(),
        }
    }
}

/// A persisted feedback entry. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    /// Identifies the mapping call being rated.
    pub request_hash: String,
    pub rating: Rating,
    #[serde(default)]
    pub corrections: String,
    #[serde(default)]
    pub column_fixes: Vec<ColumnCorrection>,
    #[serde(default)]
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// True when the entry carries free-text corrections or column fixes.
    pub fn has_correction_payload(&self) -> bool {
        !self.corrections.trim().is_empty() || !self.column_fixes.is_empty()
    }
}

/// Identical corrections aggregated across feedback rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionFrequency {
    pub source_header: String,
    pub wrong_mapping: String,
    pub correct_mapping: String,
    pub frequency: usize,
}

/// Direction of the recent positive-rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl Trend {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters over the feedback log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_count: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    /// Fraction of entries rated thumbs-up, 0 when empty.
    pub positive_rate: f64,
    pub recent_trend: Trend,
}

/// Kind of systemic issue detected in feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    LowRatingCluster,
    WidespreadNegative,
    ColumnCorrectionNeeded,
}

impl PatternKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LowRatingCluster => "low_rating_cluster",
            Self::WidespreadNegative => "widespread_negative",
            Self::ColumnCorrectionNeeded => "column_correction_needed",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    High,
    Medium,
}

impl PatternSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

/// A detected feedback pattern. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPattern {
    pub kind: PatternKind,
    pub frequency: usize,
    /// Empty for global patterns.
    pub request_hash: String,
    pub suggestion: String,
    pub severity: PatternSeverity,
}
