//! Command implementations. Printing lives in the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use colmap_core::{ColmapConfig, MappingPipeline, QuickAcceptance};
use colmap_feedback::{
    ExamplePool, ExampleRepository, FeedbackStore, InMemoryExamplePool, Learner, LearningReport,
    NewFeedback,
};
use colmap_ingest::{HeaderDetection, TableDetectionResult, detect_header_row, quick_detect};
use colmap_model::{ColumnCorrection, Feedback};
use tracing::{debug, info};

/// Feedback log used when neither `--store` nor the config names one.
pub const DEFAULT_STORE_PATH: &str = "colmap-feedback.jsonl";

/// Fast-path detection of one input file.
#[derive(Debug, Clone)]
pub struct Detection {
    pub table: TableDetectionResult,
    pub header: HeaderDetection,
}

/// Result of `feedback learn`.
#[derive(Debug, Clone)]
pub struct LearnOutcome {
    pub report: LearningReport,
    /// Directory the examples were written to, `None` for an in-memory pool.
    pub examples_dir: Option<PathBuf>,
}

/// Loads the config file when given, otherwise the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ColmapConfig> {
    match path {
        Some(path) => {
            let config = ColmapConfig::load_from(path)?;
            debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(ColmapConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Runs quick detection on a file. `None` means full analysis is needed.
pub fn run_detect(path: &Path) -> Result<Option<Detection>> {
    let content = read_input(path)?;
    let detection = quick_detect(&content).map(|table| {
        let header = detect_header_row(&table.rows);
        Detection { table, header }
    });
    match &detection {
        Some(found) => info!(
            format = found.table.format.as_str(),
            confidence = found.table.confidence,
            rows = found.table.rows.len(),
            "detected table"
        ),
        None => info!("no fast-path table format detected"),
    }
    Ok(detection)
}

/// Accepts a file as a table and maps it in table mode.
pub fn run_table(config: &ColmapConfig, path: &Path) -> Result<QuickAcceptance> {
    let content = read_input(path)?;
    let pipeline = MappingPipeline::from_config(config, None);
    pipeline
        .quick_accept(&content)
        .ok_or_else(|| anyhow!("{} is not well-formed TSV, Markdown or CSV", path.display()))
}

/// Opens the feedback log. `--store` wins over the configured path.
pub fn open_store(config: &ColmapConfig, store_override: Option<&Path>) -> Result<FeedbackStore> {
    let path = store_override
        .map(Path::to_path_buf)
        .or_else(|| config.feedback.store_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    FeedbackStore::open(&path).with_context(|| format!("open feedback log {}", path.display()))
}

/// Parses a `HEADER:WRONG:CORRECT` column fix.
///
/// Splits from the right so the source header may itself contain colons.
pub fn parse_fix(value: &str) -> Result<ColumnCorrection> {
    let mut parts = value.rsplitn(3, ':');
    let (Some(correct), Some(wrong), Some(header)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("column fix '{value}' must look like HEADER:WRONG:CORRECT");
    };
    if header.trim().is_empty() || correct.trim().is_empty() {
        bail!("column fix '{value}' needs a source header and a correct mapping");
    }
    Ok(ColumnCorrection::new(
        header.trim(),
        wrong.trim(),
        correct.trim(),
    ))
}

/// Records one rating with its corrections.
pub fn run_submit(
    store: &FeedbackStore,
    request_hash: &str,
    rating: i32,
    fixes: &[String],
    notes: &str,
    session: &str,
) -> Result<Feedback> {
    let mut new = NewFeedback::new(request_hash, rating)
        .with_corrections(notes)
        .with_session(session);
    for fix in fixes {
        new = new.with_column_fix(parse_fix(fix)?);
    }
    store
        .submit(new)
        .map_err(|error| anyhow!(error.user_message()))
}

/// Learns examples from recent feedback into the configured example pool.
pub fn run_learn(config: &ColmapConfig, store: &FeedbackStore, days: i64) -> Result<LearnOutcome> {
    let max = config.feedback.max_learned_corrections;
    let outcome = match &config.examples.dir {
        Some(dir) => {
            let repository = ExampleRepository::new(dir)
                .with_context(|| format!("open example directory {}", dir.display()))?;
            let report = learn_into(store, &repository, max, days)?;
            LearnOutcome {
                report,
                examples_dir: Some(dir.clone()),
            }
        }
        None => {
            let pool = InMemoryExamplePool::new();
            let report = learn_into(store, &pool, max, days)?;
            LearnOutcome {
                report,
                examples_dir: None,
            }
        }
    };
    Ok(outcome)
}

fn learn_into(
    store: &FeedbackStore,
    pool: &dyn ExamplePool,
    max_corrections: usize,
    days: i64,
) -> Result<LearningReport> {
    Learner::new(store, pool)
        .with_max_corrections(max_corrections)
        .learn_from_feedback(days)
        .context("learn from feedback")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fix_splits_from_the_right() {
        let fix = parse_fix("Time: start:notes:started_at").unwrap();
        assert_eq!(fix.source_header, "Time: start");
        assert_eq!(fix.wrong_mapping, "notes");
        assert_eq!(fix.correct_mapping, "started_at");
    }

    #[test]
    fn parse_fix_allows_empty_wrong_mapping() {
        let fix = parse_fix("Owner::assignee").unwrap();
        assert_eq!(fix.wrong_mapping, "");
        assert_eq!(fix.correct_mapping, "assignee");
    }

    #[test]
    fn parse_fix_rejects_short_values() {
        assert!(parse_fix("Owner:assignee").is_err());
        assert!(parse_fix(":notes:title").is_err());
        assert!(parse_fix("Owner:notes:").is_err());
    }
}
