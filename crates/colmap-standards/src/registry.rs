//! Canonical schema registry.
//!
//! Static, read-only table of the canonical fields each document type must
//! provide. Unknown schema names fall back to [`SchemaType::Generic`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Document types with a known canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    TestCase,
    ProductBacklog,
    IssueTracker,
    ApiSpec,
    UiSpec,
    Generic,
}

impl SchemaType {
    /// Every schema type, generic last.
    pub const ALL: [SchemaType; 6] = [
        Self::TestCase,
        Self::ProductBacklog,
        Self::IssueTracker,
        Self::ApiSpec,
        Self::UiSpec,
        Self::Generic,
    ];

    /// Resolves a schema name, tolerating case, spaces and dashes.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "test_case" | "test_cases" | "testcase" => Self::TestCase,
            "product_backlog" | "backlog" => Self::ProductBacklog,
            "issue_tracker" | "issues" => Self::IssueTracker,
            "api_spec" | "api" => Self::ApiSpec,
            "ui_spec" | "ui" => Self::UiSpec,
            _ => Self::Generic,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TestCase => "test_case",
            Self::ProductBacklog => "product_backlog",
            Self::IssueTracker => "issue_tracker",
            Self::ApiSpec => "api_spec",
            Self::UiSpec => "ui_spec",
            Self::Generic => "generic",
        }
    }

    /// Canonical fields a mapping for this schema must contain.
    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::TestCase => &["id", "scenario", "instructions", "expected"],
            Self::ProductBacklog => &["id", "title", "description", "acceptance_criteria"],
            Self::IssueTracker => &["id", "feature", "priority", "status"],
            Self::ApiSpec => &["endpoint", "method", "parameters", "response"],
            Self::UiSpec => &["item_name", "item_type", "action"],
            Self::Generic => &["id", "feature"],
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required canonical fields for a schema name.
pub fn required_fields_by_schema(schema_name: &str) -> &'static [&'static str] {
    SchemaType::from_name(schema_name).required_fields()
}
