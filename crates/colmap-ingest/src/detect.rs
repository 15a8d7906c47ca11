//! Quick format detection for pasted tabular text.
//!
//! [`quick_detect`] recognizes input that is already well-formed delimited
//! data so callers can skip the paid mapping path. It is an optimization:
//! `None` means "not obviously a table", never "not a table".

use std::fmt;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Confidence assigned to a consistent tab-separated table.
pub const TSV_CONFIDENCE: f64 = 0.95;
/// Confidence assigned to a Markdown table with a separator row.
pub const MARKDOWN_CONFIDENCE: f64 = 0.90;
/// Minimum CSV reliability score for acceptance.
pub const CSV_RELIABILITY_FLOOR: f64 = 0.60;
/// Upper bound of the CSV reliability score.
const CSV_MAX_CONFIDENCE: f64 = 0.90;
/// Mean cell length above which rows read as prose rather than data.
const PROSE_CELL_LENGTH: f64 = 40.0;

/// Recognized delimited formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Tsv,
    Csv,
    Markdown,
}

impl TableFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected table. `rows` includes the header row; every row has the
/// same number of trimmed cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDetectionResult {
    pub format: TableFormat,
    pub confidence: f64,
    pub rows: Vec<Vec<String>>,
}

impl TableDetectionResult {
    /// The first row.
    pub fn headers(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// All rows after the first.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Up to `limit` data rows.
    pub fn sample_rows(&self, limit: usize) -> Vec<Vec<String>> {
        self.data_rows().iter().take(limit).cloned().collect()
    }

    pub fn column_count(&self) -> usize {
        self.headers().len()
    }
}

/// Classifies `content` as TSV, Markdown table, or CSV, in that order.
pub fn quick_detect(content: &str) -> Option<TableDetectionResult> {
    let lines: Vec<&str> = content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let detected = detect_tsv(&lines)
        .or_else(|| detect_markdown(&lines))
        .or_else(|| detect_csv(&lines));
    match &detected {
        Some(result) => debug!(
            format = %result.format,
            confidence = result.confidence,
            rows = result.rows.len(),
            columns = result.column_count(),
            "quick detection accepted input"
        ),
        None => debug!(lines = lines.len(), "quick detection found no table"),
    }
    detected
}

fn detect_tsv(lines: &[&str]) -> Option<TableDetectionResult> {
    if lines.len() < 2 || !lines.iter().all(|line| line.contains('\t')) {
        return None;
    }
    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| line.split('\t').map(|cell| cell.trim().to_string()).collect())
        .collect();
    if !has_consistent_width(&rows) {
        trace!("tab-separated lines have inconsistent field counts");
        return None;
    }
    Some(TableDetectionResult {
        format: TableFormat::Tsv,
        confidence: TSV_CONFIDENCE,
        rows,
    })
}

fn detect_markdown(lines: &[&str]) -> Option<TableDetectionResult> {
    let table_lines: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| line.starts_with('|'))
        .collect();
    if table_lines.len() < 2 || !is_markdown_separator(table_lines[1]) {
        return None;
    }
    let header = split_markdown_row(table_lines[0]);
    if header.is_empty() {
        return None;
    }
    let width = header.len();
    let mut rows = vec![header];
    for line in table_lines.iter().skip(2) {
        if is_markdown_separator(line) {
            continue;
        }
        let mut cells = split_markdown_row(line);
        if cells.len() > width {
            debug!(
                width,
                cells = cells.len(),
                "markdown row is wider than its header"
            );
            return None;
        }
        cells.resize(width, String::new());
        rows.push(cells);
    }
    Some(TableDetectionResult {
        format: TableFormat::Markdown,
        confidence: MARKDOWN_CONFIDENCE,
        rows,
    })
}

fn split_markdown_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_markdown_separator(line: &str) -> bool {
    let cells = split_markdown_row(line);
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let core = cell.trim_start_matches(':').trim_end_matches(':');
            !core.is_empty() && core.chars().all(|ch| ch == '-')
        })
}

fn detect_csv(lines: &[&str]) -> Option<TableDetectionResult> {
    if lines.len() < 2 || !lines.iter().any(|line| line.contains(',')) {
        return None;
    }
    let joined = lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());
    let mut rows = Vec::with_capacity(lines.len());
    for record in reader.records() {
        let Ok(record) = record else {
            trace!("comma-delimited parse failed");
            return None;
        };
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    let score = csv_reliability(&rows);
    if score < CSV_RELIABILITY_FLOOR {
        trace!(score, "comma-delimited input below reliability floor");
        return None;
    }
    Some(TableDetectionResult {
        format: TableFormat::Csv,
        confidence: score,
        rows,
    })
}

/// Scores how likely parsed comma-delimited rows are a real table.
///
/// Inconsistent widths, fewer than two rows, or single-column rows score 0.
fn csv_reliability(rows: &[Vec<String>]) -> f64 {
    if rows.len() < 2 || !has_consistent_width(rows) || rows[0].len() < 2 {
        return 0.0;
    }
    let mut score: f64 = 0.5;
    if rows.len() >= 3 {
        score += 0.1;
    }
    if rows.len() >= 5 {
        score += 0.1;
    }
    if looks_like_header(&rows[0]) {
        score += 0.15;
    }

    let cells: Vec<&String> = rows.iter().flatten().collect();
    let empty = cells.iter().filter(|cell| cell.is_empty()).count();
    let mean_len =
        cells.iter().map(|cell| cell.chars().count()).sum::<usize>() as f64 / cells.len() as f64;
    if empty as f64 / cells.len() as f64 > 0.5 {
        score -= 0.2;
    }
    if mean_len > PROSE_CELL_LENGTH {
        score -= 0.2;
    }
    score.clamp(0.0, CSV_MAX_CONFIDENCE)
}

fn looks_like_header(row: &[String]) -> bool {
    row.iter().all(|cell| {
        !cell.is_empty()
            && cell.chars().count() <= PROSE_CELL_LENGTH as usize
            && cell.parse::<f64>().is_err()
            && !cell.ends_with(['.', '?', '!'])
    })
}

fn has_consistent_width(rows: &[Vec<String>]) -> bool {
    let Some(first) = rows.first() else {
        return false;
    };
    first.len() >= 2 && rows.iter().all(|row| row.len() == first.len())
}
