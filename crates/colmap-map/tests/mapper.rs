//! Column mapper tests against an in-process fake backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use colmap_map::{
    AiBackend, AiMappingRequest, BackendError, ColumnMapper, ErrorCategory, MapOptions,
    MappingError, ModelRouter, apply_confidence_fallback,
};
use colmap_model::{
    CanonicalFieldMapping, ColumnMappingResult, ExtraColumnMapping, MapColumnsRequest,
    MappingFormat, MappingMeta, ModelError,
};
use proptest::prelude::*;

/// Maps "id" and "title" headers canonically, everything else as extra.
#[derive(Default)]
struct FakeBackend {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait]
impl AiBackend for FakeBackend {
    async fn map_columns(
        &self,
        request: &AiMappingRequest,
    ) -> Result<ColumnMappingResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut result = ColumnMappingResult::default();
        for (idx, header) in request.headers.iter().enumerate() {
            let name = header.trim().to_lowercase();
            if name == "id" || name == "title" {
                result.canonical_fields.push(CanonicalFieldMapping {
                    canonical_name: name,
                    source_header: header.clone(),
                    column_index: idx,
                    confidence: 0.9,
                    reasoning: format!("matched by {}", request.model),
                });
            } else {
                result.extra_columns.push(ExtraColumnMapping {
                    name: header.clone(),
                    semantic_role: "other".into(),
                    column_index: idx,
                    confidence: 0.3,
                });
            }
        }
        result.meta = MappingMeta {
            detected_type: request.schema_hint.clone(),
            source_language: request.source_lang.clone(),
            total_columns: request.headers.len(),
            ..MappingMeta::default()
        };
        Ok(result)
    }
}

/// Always answers with the same, possibly invalid, result.
struct FixedBackend(ColumnMappingResult);

#[async_trait]
impl AiBackend for FixedBackend {
    async fn map_columns(
        &self,
        _request: &AiMappingRequest,
    ) -> Result<ColumnMappingResult, BackendError> {
        Ok(self.0.clone())
    }
}

struct FailingBackend;

#[async_trait]
impl AiBackend for FailingBackend {
    async fn map_columns(
        &self,
        _request: &AiMappingRequest,
    ) -> Result<ColumnMappingResult, BackendError> {
        Err("upstream returned 503".into())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}

fn router() -> ModelRouter {
    ModelRouter::new("small", "large")
}

fn spec_request(headers: &[&str]) -> MapColumnsRequest {
    MapColumnsRequest::new(strings(headers), MappingFormat::Spec)
        .with_schema_hint("test_case")
        .with_source_lang("en")
}

#[tokio::test]
async fn table_format_needs_no_backend() {
    let mapper = ColumnMapper::new(router());
    let request = MapColumnsRequest::new(strings(&["ID", "Name"]), MappingFormat::Table);
    let result = mapper
        .map_columns(&request, MapOptions::default())
        .await
        .expect("table mapping");
    assert_eq!(result.meta.unmapped_columns, 2);
}

#[tokio::test]
async fn spec_format_without_backend_is_unavailable() {
    let mapper = ColumnMapper::new(router());
    let err = mapper
        .map_columns(&spec_request(&["ID"]), MapOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MappingError::AiUnavailable));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[tokio::test]
async fn spec_format_rejects_empty_headers() {
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(FakeBackend::default()));
    let err = mapper
        .map_columns(&spec_request(&[]), MapOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[tokio::test]
async fn equivalent_headers_hit_the_cache() {
    let backend = Arc::new(FakeBackend::default());
    let mapper = ColumnMapper::new(router()).with_backend(backend.clone());

    let first = mapper
        .map_columns_run(&spec_request(&["ID", "Title", "Status"]), MapOptions::default())
        .await
        .expect("first call");
    assert!(!first.cache_hit);
    assert_eq!(first.model.as_deref(), Some("small"));
    assert_eq!(first.result.meta.mapped_columns, 2);

    let second = mapper
        .map_columns_run(
            &spec_request(&["  STATUS ", "title", "id"]),
            MapOptions::default(),
        )
        .await
        .expect("second call");
    assert!(second.cache_hit);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let title = second
        .result
        .canonical_fields
        .iter()
        .find(|f| f.canonical_name == "title")
        .expect("title mapped");
    assert_eq!(title.column_index, 1);
    assert_eq!(title.source_header, "title");
    assert!(second.result.validate_shape(3).is_ok());

    let stats = mapper.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn different_schema_hint_does_not_share_entry() {
    let backend = Arc::new(FakeBackend::default());
    let mapper = ColumnMapper::new(router()).with_backend(backend.clone());
    mapper
        .map_columns(&spec_request(&["ID", "Title"]), MapOptions::default())
        .await
        .expect("first");
    let other = spec_request(&["ID", "Title"]).with_schema_hint("issue_tracker");
    mapper
        .map_columns(&other, MapOptions::default())
        .await
        .expect("second");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn backend_errors_are_propagated() {
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(FailingBackend));
    let err = mapper
        .map_columns(&spec_request(&["ID"]), MapOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Upstream);
    let source = std::error::Error::source(&err).expect("cause preserved");
    assert_eq!(source.to_string(), "upstream returned 503");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let backend = FakeBackend {
        delay: Some(Duration::from_secs(5)),
        ..FakeBackend::default()
    };
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(backend));
    let err = mapper
        .map_columns(
            &spec_request(&["ID"]),
            MapOptions::with_timeout(Duration::from_millis(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MappingError::Timeout { .. }));
}

#[tokio::test]
async fn invalid_backend_output_is_rejected() {
    let duplicate = ColumnMappingResult {
        canonical_fields: vec![
            CanonicalFieldMapping {
                canonical_name: "id".into(),
                source_header: "ID".into(),
                column_index: 0,
                confidence: 0.9,
                reasoning: String::new(),
            },
            CanonicalFieldMapping {
                canonical_name: "title".into(),
                source_header: "ID".into(),
                column_index: 0,
                confidence: 0.9,
                reasoning: String::new(),
            },
        ],
        ..ColumnMappingResult::default()
    };
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(FixedBackend(duplicate)));
    let err = mapper
        .map_columns(&spec_request(&["ID", "Title"]), MapOptions::default())
        .await
        .unwrap_err();
    match err {
        MappingError::InvalidResponse { source, .. } => {
            assert_eq!(source, ModelError::DuplicateColumnIndex { column_index: 0 });
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn misreported_counters_are_recomputed() {
    let result = ColumnMappingResult {
        canonical_fields: vec![CanonicalFieldMapping {
            canonical_name: "id".into(),
            source_header: "ID".into(),
            column_index: 0,
            confidence: 0.8,
            reasoning: String::new(),
        }],
        extra_columns: vec![ExtraColumnMapping {
            name: "Misc".into(),
            semantic_role: "other".into(),
            column_index: 1,
            confidence: 0.4,
        }],
        meta: MappingMeta {
            total_columns: 7,
            mapped_columns: 5,
            ..MappingMeta::default()
        },
    };
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(FixedBackend(result)));
    let result = mapper
        .map_columns(&spec_request(&["ID", "Misc"]), MapOptions::default())
        .await
        .expect("valid shape");
    assert_eq!(result.meta.total_columns, 2);
    assert_eq!(result.meta.mapped_columns, 1);
    assert_eq!(result.meta.unmapped_columns, 1);
    assert!((result.meta.avg_confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn non_english_request_routes_to_complex_model() {
    let mapper = ColumnMapper::new(router()).with_backend(Arc::new(FakeBackend::default()));
    let request = spec_request(&["ID", "Titel"]).with_source_lang("de");
    let run = mapper
        .map_columns_run(&request, MapOptions::default())
        .await
        .expect("mapped");
    assert_eq!(run.model.as_deref(), Some("large"));
}

fn arbitrary_result() -> impl Strategy<Value = (usize, ColumnMappingResult)> {
    prop::collection::vec((any::<bool>(), 0.0f64..=1.0), 1..12).prop_map(|columns| {
        let mut result = ColumnMappingResult::default();
        for (idx, (canonical, confidence)) in columns.iter().enumerate() {
            if *canonical {
                result.canonical_fields.push(CanonicalFieldMapping {
                    canonical_name: format!("field_{idx}"),
                    source_header: format!("Header {idx}"),
                    column_index: idx,
                    confidence: *confidence,
                    reasoning: String::new(),
                });
            } else {
                result.extra_columns.push(ExtraColumnMapping {
                    name: format!("Header {idx}"),
                    semantic_role: "other".into(),
                    column_index: idx,
                    confidence: *confidence,
                });
            }
        }
        result.meta.total_columns = columns.len();
        (columns.len(), result)
    })
}

proptest! {
    #[test]
    fn fallback_is_a_partition((columns, result) in arbitrary_result()) {
        let before = result.entry_count();
        let after = apply_confidence_fallback(result);
        prop_assert_eq!(after.entry_count(), before);
        prop_assert_eq!(after.meta.total_columns, columns);
        prop_assert!(after.validate_shape(columns).is_ok());
        prop_assert!(after.canonical_fields.iter().all(|f| f.confidence >= 0.40));
    }
}
