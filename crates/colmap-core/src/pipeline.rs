//! Mapping pipeline.
//!
//! detect → map → fallback → review gate → semantic check.

use std::sync::Arc;

use colmap_ingest::{HeaderDetection, TableDetectionResult, detect_header_row, quick_detect};
use colmap_map::{
    AiBackend, ColumnMapper, ConfidenceLevel, ConfidenceThresholds, MapOptions, MappingError,
    apply_confidence_fallback, table_mapping,
};
use colmap_model::{ColumnMappingResult, MapColumnsRequest, MappingFormat};
use colmap_validate::{SemanticReport, validate_mapping_semantics};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::ColmapConfig;

/// Everything a caller needs to act on a mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingOutcome {
    pub result: ColumnMappingResult,
    /// True when a human must confirm the mapping before it is used.
    pub review_required: bool,
    pub confidence_level: ConfidenceLevel,
    /// Semantic check, present when the request named a schema.
    pub validation: Option<SemanticReport>,
    /// Model chosen by the router. `None` for table mappings.
    pub model: Option<String>,
    pub header_confidence: u8,
    pub cache_hit: bool,
}

/// A fast-path acceptance of well-formed delimited input.
#[derive(Debug, Clone)]
pub struct QuickAcceptance {
    pub table: TableDetectionResult,
    pub header: HeaderDetection,
    pub request: MapColumnsRequest,
    pub outcome: MappingOutcome,
}

/// Runs mapping requests through the full evaluation chain.
pub struct MappingPipeline {
    mapper: ColumnMapper,
    thresholds: ConfidenceThresholds,
    options: MapOptions,
    sample_rows: usize,
}

impl MappingPipeline {
    pub fn new(mapper: ColumnMapper) -> Self {
        Self {
            mapper,
            thresholds: ConfidenceThresholds::DEFAULT,
            options: MapOptions::default(),
            sample_rows: 5,
        }
    }

    /// Builds a pipeline from configuration and an optional AI backend.
    pub fn from_config(config: &ColmapConfig, backend: Option<Arc<dyn AiBackend>>) -> Self {
        let mut mapper =
            ColumnMapper::new(config.model_router()).with_cache(config.mapping_cache());
        if let Some(backend) = backend {
            mapper = mapper.with_backend(backend);
        }
        Self {
            mapper,
            thresholds: ConfidenceThresholds::DEFAULT,
            options: config.map_options(),
            sample_rows: config.mapping.sample_rows,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mapper(&self) -> &ColumnMapper {
        &self.mapper
    }

    /// Accepts `content` as a table without any AI call when it is clearly
    /// delimited data. Returns `None` when full analysis is needed.
    ///
    /// The review gate is applied with the detection confidence in place of a
    /// mapping confidence. Table columns are kept deliberately, so none count
    /// as unmapped.
    pub fn quick_accept(&self, content: &str) -> Option<QuickAcceptance> {
        let table = quick_detect(content)?;
        let header = detect_header_row(&table.rows);
        let headers = table.rows.get(header.index).cloned().unwrap_or_default();
        let sample_rows = table
            .rows
            .iter()
            .skip(header.index + 1)
            .take(self.sample_rows)
            .cloned()
            .collect();
        let request = MapColumnsRequest::new(headers, MappingFormat::Table)
            .with_sample_rows(sample_rows)
            .with_file_type(table.format.as_str());

        let result = table_mapping(&request);
        let review_required = self.thresholds.should_review(
            table.confidence,
            header.confidence,
            0,
            result.meta.total_columns,
        );
        info!(
            format = table.format.as_str(),
            columns = result.meta.total_columns,
            header_confidence = header.confidence,
            review_required,
            "quick-accepted table"
        );
        let outcome = MappingOutcome {
            result,
            review_required,
            confidence_level: self.thresholds.categorize(table.confidence),
            validation: None,
            model: None,
            header_confidence: header.confidence,
            cache_hit: false,
        };
        Some(QuickAcceptance {
            table,
            header,
            request,
            outcome,
        })
    }

    /// Maps `request` and evaluates the result.
    ///
    /// `header_confidence` is the 0-100 header row score of the input.
    pub async fn run(
        &self,
        request: &MapColumnsRequest,
        header_confidence: u8,
    ) -> Result<MappingOutcome, MappingError> {
        let span = info_span!("pipeline", format = %request.format, columns = request.column_count());
        let run = self.mapper.map_columns_run(request, self.options).await?;

        let _guard = span.enter();
        let result = apply_confidence_fallback(run.result);
        let meta = &result.meta;
        let review_required = self.thresholds.should_review(
            meta.avg_confidence,
            header_confidence,
            meta.unmapped_columns,
            meta.total_columns,
        );
        let confidence_level = self.thresholds.categorize(meta.avg_confidence);
        let validation = (!request.schema_hint.trim().is_empty())
            .then(|| validate_mapping_semantics(&result, &request.schema_hint));
        info!(
            mapped = meta.mapped_columns,
            unmapped = meta.unmapped_columns,
            level = confidence_level.as_str(),
            review_required,
            "mapping evaluated"
        );

        Ok(MappingOutcome {
            result,
            review_required,
            confidence_level,
            validation,
            model: run.model,
            header_confidence,
            cache_hit: run.cache_hit,
        })
    }

    /// Like [`run`](Self::run), but maps in table mode when no AI backend is
    /// configured. Upstream failures are still returned.
    pub async fn run_or_table(
        &self,
        request: &MapColumnsRequest,
        header_confidence: u8,
    ) -> Result<MappingOutcome, MappingError> {
        match self.run(request, header_confidence).await {
            Err(MappingError::AiUnavailable) => {
                warn!("no AI backend configured, falling back to table mapping");
                let mut table = request.clone();
                table.format = MappingFormat::Table;
                self.run(&table, header_confidence).await
            }
            other => other,
        }
    }
}
