//! Append-only feedback store.
//!
//! Rows live in memory behind a read/write lock and, when opened on a path,
//! are appended to a JSON Lines log. Column fixes are stored in the log as a
//! JSON text column and decoded only here.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use colmap_model::{ColumnCorrection, Feedback, FeedbackStats, Rating, Trend};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FeedbackError, Result};

/// Number of most recent entries used for the trend.
pub const TREND_WINDOW: usize = 20;

/// Minimum entries before a trend other than stable is reported.
pub const TREND_MIN_ENTRIES: usize = 4;

/// Positive-rate difference needed to leave "stable".
pub const TREND_DEADBAND: f64 = 0.10;

/// Feedback as submitted by a reviewer, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewFeedback {
    pub request_hash: String,
    /// Raw rating; only 1 and 5 are accepted.
    pub rating: i32,
    pub corrections: String,
    pub column_fixes: Vec<ColumnCorrection>,
    pub session_id: String,
}

impl NewFeedback {
    pub fn new(request_hash: impl Into<String>, rating: i32) -> Self {
        Self {
            request_hash: request_hash.into(),
            rating,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_corrections(mut self, text: impl Into<String>) -> Self {
        self.corrections = text.into();
        self
    }

    #[must_use]
    pub fn with_column_fix(mut self, fix: ColumnCorrection) -> Self {
        self.column_fixes.push(fix);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// One log line.
#[derive(Debug, Serialize, Deserialize)]
struct StoredFeedback {
    id: String,
    request_hash: String,
    rating: Rating,
    #[serde(default)]
    corrections: String,
    /// JSON-encoded `Vec<ColumnCorrection>`.
    #[serde(default)]
    column_fixes: String,
    #[serde(default)]
    session_id: String,
    created_at: DateTime<Utc>,
}

impl StoredFeedback {
    fn encode(feedback: &Feedback) -> Result<Self> {
        let column_fixes = serde_json::to_string(&feedback.column_fixes).map_err(|source| {
            FeedbackError::Serialization {
                what: "column fixes",
                source,
            }
        })?;
        Ok(Self {
            id: feedback.id.clone(),
            request_hash: feedback.request_hash.clone(),
            rating: feedback.rating,
            corrections: feedback.corrections.clone(),
            column_fixes,
            session_id: feedback.session_id.clone(),
            created_at: feedback.created_at,
        })
    }

    fn decode_fixes(&self) -> Result<Vec<ColumnCorrection>> {
        if self.column_fixes.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.column_fixes).map_err(|source| {
            FeedbackError::MalformedPayload {
                id: self.id.clone(),
                source,
            }
        })
    }

    /// Decodes the row. A malformed fix payload is logged and dropped so the
    /// rating itself still counts.
    fn into_feedback(self) -> Feedback {
        let column_fixes = self.decode_fixes().unwrap_or_else(|err| {
            warn!(error = %err, "skipping malformed correction payload");
            Vec::new()
        });
        Feedback {
            id: self.id,
            request_hash: self.request_hash,
            rating: self.rating,
            corrections: self.corrections,
            column_fixes,
            session_id: self.session_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct Rows {
    entries: Vec<Feedback>,
    by_request_hash: HashMap<String, Vec<usize>>,
}

impl Rows {
    fn push(&mut self, feedback: Feedback) {
        self.by_request_hash
            .entry(feedback.request_hash.clone())
            .or_default()
            .push(self.entries.len());
        self.entries.push(feedback);
    }
}

/// Append-only feedback log.
#[derive(Debug, Default)]
pub struct FeedbackStore {
    rows: RwLock<Rows>,
    log_path: Option<PathBuf>,
}

impl FeedbackStore {
    /// A store that keeps rows in memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the log at `path`, replaying existing rows. A missing file is
    /// created on the first submit.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut rows = Rows::default();
        if path.exists() {
            let file = File::open(&path).map_err(|source| FeedbackError::Io {
                operation: "open",
                path: path.clone(),
                source,
            })?;
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|source| FeedbackError::Io {
                    operation: "read",
                    path: path.clone(),
                    source,
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StoredFeedback>(&line) {
                    Ok(stored) => rows.push(stored.into_feedback()),
                    Err(err) => {
                        warn!(line = line_no + 1, error = %err, "skipping unparseable feedback record");
                    }
                }
            }
        }
        info!(path = %path.display(), rows = rows.entries.len(), "opened feedback store");
        Ok(Self {
            rows: RwLock::new(rows),
            log_path: Some(path),
        })
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rows> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and records feedback, returning the stored row.
    ///
    /// Id and timestamp are assigned inside the write lock, so concurrent
    /// submits are totally ordered.
    pub fn submit(&self, new: NewFeedback) -> Result<Feedback> {
        let rating =
            Rating::try_from(new.rating).map_err(|_| FeedbackError::InvalidRating(new.rating))?;
        if new.request_hash.trim().is_empty() {
            return Err(FeedbackError::EmptyRequestHash);
        }

        let mut rows = self.write();
        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            request_hash: new.request_hash,
            rating,
            corrections: new.corrections,
            column_fixes: new.column_fixes,
            session_id: new.session_id,
            created_at: Utc::now(),
        };
        if let Some(path) = &self.log_path {
            append_line(path, &StoredFeedback::encode(&feedback)?)?;
        }
        rows.push(feedback.clone());
        info!(
            id = %feedback.id,
            request_hash = %feedback.request_hash,
            rating = feedback.rating.value(),
            "recorded feedback"
        );
        Ok(feedback)
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every row in insertion order.
    pub fn all(&self) -> Vec<Feedback> {
        self.read().entries.clone()
    }

    /// Rows created at or after `cutoff`, in insertion order.
    pub fn list_since(&self, cutoff: DateTime<Utc>) -> Vec<Feedback> {
        self.read()
            .entries
            .iter()
            .filter(|f| f.created_at >= cutoff)
            .cloned()
            .collect()
    }

    /// All rows for `request_hash`, newest first.
    pub fn get_by_request_hash(&self, request_hash: &str) -> Vec<Feedback> {
        let rows = self.read();
        rows.by_request_hash
            .get(request_hash)
            .map(|indices| {
                indices
                    .iter()
                    .rev()
                    .map(|&idx| rows.entries[idx].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Totals, positive rate and the recent trend.
    pub fn stats(&self) -> FeedbackStats {
        let rows = self.read();
        let total_count = rows.entries.len();
        let positive_count = rows.entries.iter().filter(|f| f.rating.is_positive()).count();
        let newest_first: Vec<Rating> = rows
            .entries
            .iter()
            .rev()
            .take(TREND_WINDOW)
            .map(|f| f.rating)
            .collect();
        FeedbackStats {
            total_count,
            positive_count,
            negative_count: total_count - positive_count,
            positive_rate: positive_rate(positive_count, total_count),
            recent_trend: recent_trend(&newest_first),
        }
    }
}

fn positive_rate(positive: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        positive as f64 / total as f64
    }
}

/// Compares the positive rate of the newer half against the older half.
///
/// `newest_first` holds at most [`TREND_WINDOW`] ratings, newest first.
pub fn recent_trend(newest_first: &[Rating]) -> Trend {
    if newest_first.len() < TREND_MIN_ENTRIES {
        return Trend::Stable;
    }
    let (recent, older) = newest_first.split_at(newest_first.len() / 2);
    let rate = |ratings: &[Rating]| {
        positive_rate(
            ratings.iter().filter(|r| r.is_positive()).count(),
            ratings.len(),
        )
    };
    let delta = rate(recent) - rate(older);
    debug!(delta, "feedback trend");
    if delta > TREND_DEADBAND {
        Trend::Improving
    } else if delta < -TREND_DEADBAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn append_line(path: &Path, record: &StoredFeedback) -> Result<()> {
    let mut line = serde_json::to_string(record).map_err(|source| FeedbackError::Serialization {
        what: "feedback record",
        source,
    })?;
    line.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FeedbackError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FeedbackError::Io {
            operation: "open",
            path: path.to_path_buf(),
            source,
        })?;
    file.write_all(line.as_bytes())
        .map_err(|source| FeedbackError::Io {
            operation: "write",
            path: path.to_path_buf(),
            source,
        })?;
    file.sync_data().map_err(|source| FeedbackError::Io {
        operation: "sync",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(store: &FeedbackStore, hash: &str, rating: i32) -> Feedback {
        store
            .submit(NewFeedback::new(hash, rating))
            .expect("valid feedback")
    }

    #[test]
    fn only_binary_ratings_are_accepted() {
        let store = FeedbackStore::in_memory();
        for rating in [0, 2, 3, 4, 6, -1, 100] {
            let err = store.submit(NewFeedback::new("req", rating)).unwrap_err();
            assert!(matches!(err, FeedbackError::InvalidRating(r) if r == rating));
        }
        assert!(store.is_empty());
        assert_eq!(submit(&store, "req", 1).rating, Rating::ThumbsDown);
        assert_eq!(submit(&store, "req", 5).rating, Rating::ThumbsUp);
    }

    #[test]
    fn blank_request_hash_is_rejected() {
        let store = FeedbackStore::in_memory();
        let err = store.submit(NewFeedback::new("  ", 5)).unwrap_err();
        assert!(matches!(err, FeedbackError::EmptyRequestHash));
        assert!(err.is_validation());
        assert!(store.is_empty());
    }

    #[test]
    fn submit_assigns_id_and_timestamp() {
        let store = FeedbackStore::in_memory();
        let before = Utc::now();
        let a = submit(&store, "req", 5);
        let b = submit(&store, "req", 5);
        assert_ne!(a.id, b.id);
        assert!(a.created_at >= before);
        assert!(b.created_at >= a.created_at);
    }

    #[test]
    fn lookup_by_hash_is_newest_first() {
        let store = FeedbackStore::in_memory();
        let first = submit(&store, "a", 1);
        submit(&store, "b", 5);
        let second = submit(&store, "a", 5);
        let rows = store.get_by_request_hash("a");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);
        assert!(store.get_by_request_hash("missing").is_empty());
    }

    #[test]
    fn stats_count_ratings() {
        let store = FeedbackStore::in_memory();
        assert_eq!(store.stats(), FeedbackStats::default());
        submit(&store, "a", 5);
        submit(&store, "a", 5);
        submit(&store, "a", 1);
        let stats = store.stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.positive_count, 2);
        assert_eq!(stats.negative_count, 1);
        assert!((stats.positive_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.recent_trend, Trend::Stable);
    }

    #[test]
    fn trend_needs_four_entries() {
        use Rating::{ThumbsDown, ThumbsUp};
        assert_eq!(recent_trend(&[ThumbsUp, ThumbsUp, ThumbsDown]), Trend::Stable);
        assert_eq!(recent_trend(&[]), Trend::Stable);
    }

    #[test]
    fn trend_compares_halves() {
        let store = FeedbackStore::in_memory();
        for _ in 0..4 {
            submit(&store, "a", 1);
        }
        for _ in 0..6 {
            submit(&store, "a", 5);
        }
        assert_eq!(store.stats().recent_trend, Trend::Improving);

        let store = FeedbackStore::in_memory();
        for _ in 0..4 {
            submit(&store, "a", 5);
        }
        for _ in 0..6 {
            submit(&store, "a", 1);
        }
        assert_eq!(store.stats().recent_trend, Trend::Declining);
    }

    #[test]
    fn trend_uses_only_recent_window() {
        let store = FeedbackStore::in_memory();
        // Older history outside the window must not matter.
        for _ in 0..30 {
            submit(&store, "a", 1);
        }
        for _ in 0..20 {
            submit(&store, "a", 5);
        }
        assert_eq!(store.stats().recent_trend, Trend::Stable);
    }
}
