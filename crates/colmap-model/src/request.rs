//! Column mapping request types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// How the input table should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingFormat {
    /// Map headers onto a canonical document schema.
    #[default]
    Spec,
    /// Keep the table as-is; every header becomes an extra column.
    Table,
}

impl MappingFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for MappingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spec" => Ok(Self::Spec),
            "table" => Ok(Self::Table),
            other => Err(ModelError::InvalidFormat(other.to_string())),
        }
    }
}

/// A single mapping call. Created per request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapColumnsRequest {
    /// Source headers in column order. Duplicates are allowed.
    pub headers: Vec<String>,
    /// A few representative data rows.
    #[serde(default)]
    pub sample_rows: Vec<Vec<String>>,
    pub format: MappingFormat,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub source_lang: String,
    /// Target schema name (e.g. "test_case"), empty when unknown.
    #[serde(default)]
    pub schema_hint: String,
}

impl MapColumnsRequest {
    pub fn new(headers: Vec<String>, format: MappingFormat) -> Self {
        Self {
            headers,
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sample_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.sample_rows = rows;
        self
    }

    #[must_use]
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    #[must_use]
    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        self.source_lang = lang.into();
        self
    }

    #[must_use]
    pub fn with_schema_hint(mut self, schema: impl Into<String>) -> Self {
        self.schema_hint = schema.into();
        self
    }

    /// Number of source columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}
