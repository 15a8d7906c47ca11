//! Turns recurring column corrections into few-shot examples.

use colmap_model::{
    COLUMN_MAPPING_OPERATION, CanonicalFieldMapping, CorrectionFrequency, Example,
};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::analyzer::PatternAnalyzer;
use crate::error::Result;
use crate::pool::ExamplePool;
use crate::store::FeedbackStore;

/// Most corrections considered per learning run.
pub const DEFAULT_MAX_CORRECTIONS: usize = 20;

/// Schema type recorded on learned examples.
pub const USER_CORRECTION_SCHEMA: &str = "user_correction";

/// Source recorded on learned examples.
pub const USER_FEEDBACK_SOURCE: &str = "user_feedback";

/// Language recorded on learned examples; corrections apply to any language.
pub const ANY_LANGUAGE: &str = "any";

/// Outcome of one learning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningReport {
    pub patterns_found: usize,
    pub corrections_found: usize,
    pub examples_generated: usize,
    /// Examples the pool refused. The run continues past them.
    pub examples_failed: usize,
    /// One line per pattern, per generated example and per refused example.
    pub improvements: Vec<String>,
}

/// Learns examples from the feedback log into an example pool.
pub struct Learner<'a> {
    store: &'a FeedbackStore,
    pool: &'a dyn ExamplePool,
    max_corrections: usize,
}

impl<'a> Learner<'a> {
    pub fn new(store: &'a FeedbackStore, pool: &'a dyn ExamplePool) -> Self {
        Self {
            store,
            pool,
            max_corrections: DEFAULT_MAX_CORRECTIONS,
        }
    }

    #[must_use]
    pub fn with_max_corrections(mut self, max: usize) -> Self {
        self.max_corrections = max;
        self
    }

    /// Analyzes the last `days` days (30 when `days <= 0`) and registers one
    /// example per corrected source header.
    pub fn learn_from_feedback(&self, days: i64) -> Result<LearningReport> {
        let _span = info_span!("learn_from_feedback", days).entered();
        let analyzer = PatternAnalyzer::new(self.store);
        let patterns = analyzer.analyze_patterns(days);
        let corrections = analyzer.top_corrections_in_window(days, self.max_corrections);

        let mut report = LearningReport {
            patterns_found: patterns.len(),
            corrections_found: corrections.len(),
            ..LearningReport::default()
        };
        report.improvements.extend(patterns.iter().map(|p| {
            format!("[{}] {}: {}", p.severity.as_str(), p.kind, p.suggestion)
        }));

        for example in build_examples(&corrections) {
            let targets: Vec<&str> = example
                .mappings
                .iter()
                .map(|m| m.canonical_name.as_str())
                .collect();
            let line = format!(
                "Learned example: '{}' -> {}",
                example.headers.join(", "),
                targets.join(" | ")
            );
            let header = example.headers.join(", ");
            match self.pool.register(example) {
                Ok(()) => {
                    report.examples_generated += 1;
                    report.improvements.push(line);
                }
                Err(err) => {
                    warn!(header = %header, error = %err, "failed to register learned example");
                    report.examples_failed += 1;
                    report
                        .improvements
                        .push(format!("Failed to store example for '{header}': {err}"));
                }
            }
        }

        info!(
            patterns = report.patterns_found,
            corrections = report.corrections_found,
            examples = report.examples_generated,
            failed = report.examples_failed,
            "learning run finished"
        );
        Ok(report)
    }
}

/// Groups corrections by source header, keeping the order in which headers
/// first appear.
pub fn build_examples(corrections: &[CorrectionFrequency]) -> Vec<Example> {
    let mut examples: Vec<Example> = Vec::new();
    for correction in corrections {
        let mapping = CanonicalFieldMapping {
            canonical_name: correction.correct_mapping.clone(),
            source_header: correction.source_header.clone(),
            column_index: 0,
            confidence: 1.0,
            reasoning: format!(
                "Users corrected '{}' from '{}' to '{}' {} time(s)",
                correction.source_header,
                correction.wrong_mapping,
                correction.correct_mapping,
                correction.frequency
            ),
        };
        match examples
            .iter_mut()
            .find(|e| e.headers.first() == Some(&correction.source_header))
        {
            Some(example) => example.mappings.push(mapping),
            None => examples.push(Example {
                operation: COLUMN_MAPPING_OPERATION.to_string(),
                schema_type: USER_CORRECTION_SCHEMA.to_string(),
                language: ANY_LANGUAGE.to_string(),
                headers: vec![correction.source_header.clone()],
                mappings: vec![mapping],
                source: USER_FEEDBACK_SOURCE.to_string(),
            }),
        }
    }
    examples
}
