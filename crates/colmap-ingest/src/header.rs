//! Header-row detection.
//!
//! Pasted tables sometimes carry a title or a blank-ish row above the real
//! header. The detector inspects the first rows by content statistics and
//! reports which row holds the headers together with a 0-100 confidence.

use serde::{Deserialize, Serialize};

/// Number of leading rows inspected.
const PROBE_ROWS: usize = 5;

/// Confidence when a header row is followed by data.
const CONFIDENCE_CONFIRMED: u8 = 90;
/// Confidence when a header-like row is found but no data row follows.
const CONFIDENCE_UNCONFIRMED: u8 = 75;
/// Confidence when no row looks like a header.
const CONFIDENCE_ASSUMED: u8 = 50;

/// Location and certainty of the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDetection {
    /// Index of the header row within the inspected rows.
    pub index: usize,
    /// Certainty on a 0-100 scale.
    pub confidence: u8,
}

#[derive(Debug, Default, Clone, Copy)]
struct RowStats {
    total: usize,
    non_empty: usize,
    numeric: usize,
    alpha: usize,
    identifier: usize,
}

impl RowStats {
    fn ratio(self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }

    fn non_empty_ratio(self) -> f64 {
        self.ratio(self.non_empty)
    }

    fn numeric_ratio(self) -> f64 {
        self.ratio(self.numeric)
    }

    fn alpha_ratio(self) -> f64 {
        self.ratio(self.alpha)
    }

    fn identifier_ratio(self) -> f64 {
        self.ratio(self.identifier)
    }

    fn empty_ratio(self) -> f64 {
        1.0 - self.non_empty_ratio()
    }
}

fn row_stats(row: &[String]) -> RowStats {
    let mut stats = RowStats {
        total: row.len(),
        ..RowStats::default()
    };
    for cell in row {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            continue;
        }
        stats.non_empty += 1;
        if trimmed.parse::<f64>().is_ok() {
            stats.numeric += 1;
        }
        if trimmed.chars().any(char::is_alphabetic) {
            stats.alpha += 1;
        }
        if is_identifier_like(trimmed) {
            stats.identifier += 1;
        }
    }
    stats
}

fn is_identifier_like(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | ' ' | '-'))
}

fn is_data_like(stats: RowStats) -> bool {
    stats.numeric_ratio() >= 0.2 || stats.empty_ratio() >= 0.2
}

fn is_identifier_row(stats: RowStats) -> bool {
    stats.identifier_ratio() >= 0.6 && stats.numeric_ratio() <= 0.1
}

fn is_header_like(stats: RowStats) -> bool {
    stats.non_empty_ratio() >= 0.8 && stats.alpha_ratio() >= 0.5 && stats.numeric_ratio() <= 0.1
}

fn is_title_row(stats: RowStats) -> bool {
    stats.total >= 2 && stats.non_empty == 1
}

/// Picks the header row among the first rows of a table.
///
/// Leading title rows (a single filled cell) are skipped. The last
/// header-like row before the first data-like row wins, with
/// identifier-style rows preferred over label-style rows.
pub fn detect_header_row(rows: &[Vec<String>]) -> HeaderDetection {
    if rows.is_empty() {
        return HeaderDetection {
            index: 0,
            confidence: 0,
        };
    }
    let probe = rows.len().min(PROBE_ROWS);
    let stats: Vec<RowStats> = rows.iter().take(probe).map(|row| row_stats(row)).collect();
    let start = stats
        .iter()
        .take_while(|stat| is_title_row(**stat))
        .count()
        .min(probe - 1);
    let data_index = stats
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, stat)| is_data_like(**stat))
        .map(|(idx, _)| idx);
    let search_end = data_index.unwrap_or(start + 1).max(start + 1);

    let mut candidate = None;
    let mut picked_identifier = false;
    for (idx, stat) in stats.iter().enumerate().take(search_end).skip(start) {
        if is_identifier_row(*stat) {
            candidate = Some(idx);
            picked_identifier = true;
        } else if !picked_identifier && is_header_like(*stat) {
            candidate = Some(idx);
        }
    }

    match candidate {
        Some(index) if data_index.is_some_and(|data| data > index) => HeaderDetection {
            index,
            confidence: CONFIDENCE_CONFIRMED,
        },
        Some(index) => HeaderDetection {
            index,
            confidence: CONFIDENCE_UNCONFIRMED,
        },
        None => HeaderDetection {
            index: start,
            confidence: CONFIDENCE_ASSUMED,
        },
    }
}
