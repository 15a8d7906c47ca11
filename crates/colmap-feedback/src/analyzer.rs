//! Pattern analysis over the feedback log.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use colmap_model::{
    CorrectionFrequency, Feedback, FeedbackPattern, PatternKind, PatternSeverity,
};
use tracing::debug;

use crate::store::FeedbackStore;

/// Window used when a caller passes a non-positive number of days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Corrections returned when a caller passes a zero limit.
pub const DEFAULT_CORRECTION_LIMIT: usize = 10;

/// Negative ratings for one request before it counts as a cluster.
pub const CLUSTER_MIN_NEGATIVES: usize = 3;

/// Entries in the window before the overall negative rate is judged.
pub const WIDESPREAD_MIN_ENTRIES: usize = 5;

/// Negative rate above which feedback is widespread negative.
pub const WIDESPREAD_NEGATIVE_RATE: f64 = 0.5;

/// Entries with corrections needed for a column correction pattern.
pub const CORRECTION_MIN_ENTRIES: usize = 3;

/// Read-only analysis over a [`FeedbackStore`].
#[derive(Debug, Clone, Copy)]
pub struct PatternAnalyzer<'a> {
    store: &'a FeedbackStore,
}

impl<'a> PatternAnalyzer<'a> {
    pub fn new(store: &'a FeedbackStore) -> Self {
        Self { store }
    }

    /// Detects systemic issues in the last `days` days (30 when `days <= 0`).
    pub fn analyze_patterns(&self, days: i64) -> Vec<FeedbackPattern> {
        let entries = self.store.list_since(window_start(days));
        let patterns = detect_patterns(&entries);
        debug!(entries = entries.len(), patterns = patterns.len(), "analyzed feedback");
        patterns
    }

    /// Most frequent column corrections over the whole log.
    pub fn get_top_corrections(&self, limit: usize) -> Vec<CorrectionFrequency> {
        top_corrections(&self.store.all(), limit)
    }

    /// Most frequent column corrections in the last `days` days.
    pub fn top_corrections_in_window(&self, days: i64, limit: usize) -> Vec<CorrectionFrequency> {
        top_corrections(&self.store.list_since(window_start(days)), limit)
    }
}

/// Start of a trailing window of `days` days.
///
/// Windows reaching past the representable range start at
/// [`DateTime::<Utc>::MIN_UTC`], i.e. cover the whole log.
pub fn window_start(days: i64) -> DateTime<Utc> {
    let days = if days <= 0 { DEFAULT_WINDOW_DAYS } else { days };
    Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Pattern detection over an already windowed set of entries.
pub fn detect_patterns(entries: &[Feedback]) -> Vec<FeedbackPattern> {
    let mut patterns = Vec::new();

    let mut negatives_by_hash: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries.iter().filter(|e| !e.rating.is_positive()) {
        *negatives_by_hash.entry(entry.request_hash.as_str()).or_default() += 1;
    }
    for (request_hash, negatives) in &negatives_by_hash {
        if *negatives >= CLUSTER_MIN_NEGATIVES {
            patterns.push(FeedbackPattern {
                kind: PatternKind::LowRatingCluster,
                frequency: *negatives,
                request_hash: (*request_hash).to_string(),
                suggestion: format!(
                    "Request {request_hash} received {negatives} negative ratings; review its mapping and add a targeted example"
                ),
                severity: PatternSeverity::High,
            });
        }
    }

    let negative_total: usize = negatives_by_hash.values().sum();
    if entries.len() >= WIDESPREAD_MIN_ENTRIES {
        let negative_rate = negative_total as f64 / entries.len() as f64;
        if negative_rate > WIDESPREAD_NEGATIVE_RATE {
            patterns.push(FeedbackPattern {
                kind: PatternKind::WidespreadNegative,
                frequency: negative_total,
                request_hash: String::new(),
                suggestion: format!(
                    "{:.0}% of {} recent ratings are negative; review mapping prompts and model routing",
                    negative_rate * 100.0,
                    entries.len()
                ),
                severity: PatternSeverity::High,
            });
        }
    }

    let corrected = entries.iter().filter(|e| e.has_correction_payload()).count();
    if corrected >= CORRECTION_MIN_ENTRIES {
        patterns.push(FeedbackPattern {
            kind: PatternKind::ColumnCorrectionNeeded,
            frequency: corrected,
            request_hash: String::new(),
            suggestion: format!(
                "{corrected} feedback entries carry corrections; learn examples from the recurring column fixes"
            ),
            severity: PatternSeverity::Medium,
        });
    }

    patterns
}

/// Aggregates identical correction triples, most frequent first.
///
/// Ties are broken lexically on source header, then wrong and correct mapping.
pub fn top_corrections(entries: &[Feedback], limit: usize) -> Vec<CorrectionFrequency> {
    let limit = if limit == 0 {
        DEFAULT_CORRECTION_LIMIT
    } else {
        limit
    };
    let mut counts: HashMap<(&str, &str, &str), usize> = HashMap::new();
    for fix in entries.iter().flat_map(|e| e.column_fixes.iter()) {
        *counts
            .entry((
                fix.source_header.as_str(),
                fix.wrong_mapping.as_str(),
                fix.correct_mapping.as_str(),
            ))
            .or_default() += 1;
    }

    let mut corrections: Vec<CorrectionFrequency> = counts
        .into_iter()
        .map(|((source_header, wrong_mapping, correct_mapping), frequency)| {
            CorrectionFrequency {
                source_header: source_header.to_string(),
                wrong_mapping: wrong_mapping.to_string(),
                correct_mapping: correct_mapping.to_string(),
                frequency,
            }
        })
        .collect();
    corrections.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.source_header.cmp(&b.source_header))
            .then_with(|| a.wrong_mapping.cmp(&b.wrong_mapping))
            .then_with(|| a.correct_mapping.cmp(&b.correct_mapping))
    });
    corrections.truncate(limit);
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewFeedback;
    use colmap_model::ColumnCorrection;

    fn store_with(entries: &[(&str, i32)]) -> FeedbackStore {
        let store = FeedbackStore::in_memory();
        for (hash, rating) in entries {
            store
                .submit(NewFeedback::new(*hash, *rating))
                .expect("valid feedback");
        }
        store
    }

    #[test]
    fn empty_store_has_no_patterns() {
        let store = FeedbackStore::in_memory();
        let analyzer = PatternAnalyzer::new(&store);
        assert!(analyzer.analyze_patterns(30).is_empty());
        assert!(analyzer.get_top_corrections(0).is_empty());
    }

    #[test]
    fn negative_cluster_per_request() {
        let store = store_with(&[("a", 1), ("a", 1), ("a", 1), ("b", 1), ("b", 5)]);
        let patterns = PatternAnalyzer::new(&store).analyze_patterns(0);
        let cluster: Vec<_> = patterns
            .iter()
            .filter(|p| p.kind == PatternKind::LowRatingCluster)
            .collect();
        assert_eq!(cluster.len(), 1);
        assert_eq!(cluster[0].request_hash, "a");
        assert_eq!(cluster[0].frequency, 3);
        assert_eq!(cluster[0].severity, PatternSeverity::High);
    }

    #[test]
    fn widespread_negative_needs_majority_of_five() {
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1), ("d", 5), ("e", 5)]);
        let patterns = PatternAnalyzer::new(&store).analyze_patterns(30);
        let widespread = patterns
            .iter()
            .find(|p| p.kind == PatternKind::WidespreadNegative)
            .expect("widespread pattern");
        assert_eq!(widespread.frequency, 3);
        assert!(widespread.request_hash.is_empty());

        let store = store_with(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        assert!(
            PatternAnalyzer::new(&store)
                .analyze_patterns(30)
                .iter()
                .all(|p| p.kind != PatternKind::WidespreadNegative)
        );

        // Exactly half is not a majority.
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1), ("d", 5), ("e", 5), ("f", 5)]);
        assert!(
            PatternAnalyzer::new(&store)
                .analyze_patterns(30)
                .iter()
                .all(|p| p.kind != PatternKind::WidespreadNegative)
        );
    }

    #[test]
    fn free_text_counts_as_correction_payload() {
        let store = FeedbackStore::in_memory();
        for hash in ["a", "b", "c"] {
            store
                .submit(NewFeedback::new(hash, 5).with_corrections("status column is wrong"))
                .unwrap();
        }
        let patterns = PatternAnalyzer::new(&store).analyze_patterns(30);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].kind, PatternKind::ColumnCorrectionNeeded);
        assert_eq!(patterns[0].severity, PatternSeverity::Medium);
    }

    #[test]
    fn top_corrections_aggregate_and_sort() {
        let fix = |h: &str, w: &str, c: &str| ColumnCorrection::new(h, w, c);
        let store = FeedbackStore::in_memory();
        store
            .submit(
                NewFeedback::new("a", 1)
                    .with_column_fix(fix("Prio", "status", "priority"))
                    .with_column_fix(fix("Name", "notes", "title")),
            )
            .unwrap();
        store
            .submit(NewFeedback::new("b", 1).with_column_fix(fix("Prio", "status", "priority")))
            .unwrap();
        store
            .submit(NewFeedback::new("c", 1).with_column_fix(fix("Area", "notes", "feature")))
            .unwrap();

        let top = PatternAnalyzer::new(&store).get_top_corrections(0);
        let summary: Vec<_> = top
            .iter()
            .map(|c| (c.source_header.as_str(), c.frequency))
            .collect();
        assert_eq!(summary, [("Prio", 2), ("Area", 1), ("Name", 1)]);

        let limited = PatternAnalyzer::new(&store).get_top_corrections(1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].correct_mapping, "priority");
    }

    #[test]
    fn huge_window_covers_whole_log() {
        assert_eq!(window_start(i64::MAX / 1000), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(i64::MAX), DateTime::<Utc>::MIN_UTC);

        let store = FeedbackStore::in_memory();
        for _ in 0..3 {
            store
                .submit(NewFeedback::new("req-1", 1).with_corrections("wrong column"))
                .unwrap();
        }
        let analyzer = PatternAnalyzer::new(&store);
        let patterns = analyzer.analyze_patterns(i64::MAX / 1000);
        assert!(patterns.iter().any(|p| p.kind == PatternKind::LowRatingCluster));
        assert!(analyzer.top_corrections_in_window(i64::MAX / 1000, 5).is_empty());
    }

    #[test]
    fn window_default_applies_to_non_positive_days() {
        let now = Utc::now();
        let start = window_start(-5);
        let days = (now - start).num_days();
        assert!((29..=30).contains(&days));
    }
}
