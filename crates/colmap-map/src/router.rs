//! Model routing.
//!
//! Picks the cheap model for small English schemas and escalates anything
//! larger or linguistically harder to the complex model, before any call is
//! made.

use std::fmt;

use tracing::debug;

/// Column count above which the complex model is used.
pub const DEFAULT_MAX_SIMPLE_COLUMNS: usize = 20;

/// Inputs to a routing decision.
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext<'a> {
    pub column_count: usize,
    pub headers: &'a [String],
    /// Declared source language, e.g. "en" or "de-DE". Empty when unknown.
    pub language: &'a str,
}

impl<'a> RoutingContext<'a> {
    pub fn new(headers: &'a [String], language: &'a str) -> Self {
        Self {
            column_count: headers.len(),
            headers,
            language,
        }
    }
}

/// Why a request was escalated to the complex model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    TooManyColumns(usize),
    NonEnglish(String),
    MixedScript,
    NonAsciiHeader(String),
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyColumns(n) => write!(f, "{n} columns"),
            Self::NonEnglish(lang) => write!(f, "declared language '{lang}'"),
            Self::MixedScript => f.write_str("headers mix ASCII and non-ASCII text"),
            Self::NonAsciiHeader(header) => write!(f, "header '{header}' is mostly non-ASCII"),
        }
    }
}

/// Chooses between a simple and a complex model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRouter {
    simple_model: String,
    complex_model: String,
    max_simple_columns: usize,
}

impl ModelRouter {
    pub fn new(simple_model: impl Into<String>, complex_model: impl Into<String>) -> Self {
        Self {
            simple_model: simple_model.into(),
            complex_model: complex_model.into(),
            max_simple_columns: DEFAULT_MAX_SIMPLE_COLUMNS,
        }
    }

    #[must_use]
    pub fn with_max_simple_columns(mut self, max: usize) -> Self {
        self.max_simple_columns = max;
        self
    }

    pub fn simple_model(&self) -> &str {
        &self.simple_model
    }

    pub fn complex_model(&self) -> &str {
        &self.complex_model
    }

    /// Returns the model name to use for `ctx`.
    pub fn select_model(&self, ctx: &RoutingContext<'_>) -> &str {
        match self.escalation(ctx) {
            Some(reason) => {
                debug!(model = %self.complex_model, %reason, "routing to complex model");
                &self.complex_model
            }
            None => &self.simple_model,
        }
    }

    /// The first rule that escalates `ctx`, if any.
    pub fn escalation(&self, ctx: &RoutingContext<'_>) -> Option<Escalation> {
        if ctx.column_count > self.max_simple_columns {
            return Some(Escalation::TooManyColumns(ctx.column_count));
        }
        if !is_english(ctx.language) {
            return Some(Escalation::NonEnglish(ctx.language.to_string()));
        }
        if has_mixed_script(ctx.headers) {
            return Some(Escalation::MixedScript);
        }
        ctx.headers
            .iter()
            .find(|header| is_predominantly_non_ascii(header))
            .map(|header| Escalation::NonAsciiHeader(header.clone()))
    }
}

/// True for an English or unspecified language tag.
fn is_english(language: &str) -> bool {
    let primary = language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default();
    primary.is_empty() || primary.eq_ignore_ascii_case("en")
}

/// True when the headers contain both ASCII and non-ASCII letters.
fn has_mixed_script(headers: &[String]) -> bool {
    let mut ascii = false;
    let mut non_ascii = false;
    for c in headers.iter().flat_map(|h| h.chars()).filter(|c| c.is_alphabetic()) {
        if c.is_ascii() {
            ascii = true;
        } else {
            non_ascii = true;
        }
        if ascii && non_ascii {
            return true;
        }
    }
    false
}

/// True when more than half of a header's alphanumeric characters are non-ASCII.
fn is_predominantly_non_ascii(header: &str) -> bool {
    let (total, non_ascii) = header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .fold((0usize, 0usize), |(total, non_ascii), c| {
            (total + 1, non_ascii + usize::from(!c.is_ascii()))
        });
    total > 0 && non_ascii * 2 > total
}
