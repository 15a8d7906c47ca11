//! Column mapper.
//!
//! Table-format requests are mapped deterministically. Spec-format requests
//! are routed to a model, looked up in the normalized cache and, on a miss,
//! sent to the AI backend. Backend output is validated before it is cached or
//! returned.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use colmap_model::{
    ColumnMappingResult, ExtraColumnMapping, MapColumnsRequest, MappingFormat, MappingMeta,
    TABLE_COLUMN_ROLE,
};
use tracing::{debug, info, instrument, warn};

use crate::backend::{AiBackend, AiMappingRequest};
use crate::cache::{CacheKey, CacheStats, NormalizedCache, normalize_header};
use crate::error::{MappingError, Result};
use crate::router::{ModelRouter, RoutingContext};

/// A cached backend result together with the headers it was produced for.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMapping {
    pub headers: Vec<String>,
    pub result: ColumnMappingResult,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapOptions {
    /// Deadline for the backend call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl MapOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// A mapping result plus how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRun {
    pub result: ColumnMappingResult,
    /// Model chosen by the router. `None` for table-format requests.
    pub model: Option<String>,
    pub cache_hit: bool,
}

/// Maps source columns onto canonical fields.
pub struct ColumnMapper {
    backend: Option<Arc<dyn AiBackend>>,
    router: ModelRouter,
    cache: NormalizedCache<CachedMapping>,
}

impl ColumnMapper {
    /// Creates a mapper without an AI backend. Only table format succeeds.
    pub fn new(router: ModelRouter) -> Self {
        Self {
            backend: None,
            router,
            cache: NormalizedCache::default(),
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn AiBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: NormalizedCache<CachedMapping>) -> Self {
        self.cache = cache;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Maps `request` and returns the result, pre-fallback.
    pub async fn map_columns(
        &self,
        request: &MapColumnsRequest,
        options: MapOptions,
    ) -> Result<ColumnMappingResult> {
        self.map_columns_run(request, options)
            .await
            .map(|run| run.result)
    }

    /// Like [`map_columns`](Self::map_columns), also reporting the model used
    /// and whether the cache answered.
    #[instrument(skip_all, fields(format = %request.format, columns = request.column_count()))]
    pub async fn map_columns_run(
        &self,
        request: &MapColumnsRequest,
        options: MapOptions,
    ) -> Result<MappingRun> {
        if request.format == MappingFormat::Table {
            return Ok(MappingRun {
                result: table_mapping(request),
                model: None,
                cache_hit: false,
            });
        }

        let Some(backend) = self.backend.as_ref() else {
            return Err(MappingError::AiUnavailable);
        };
        if request.headers.is_empty() {
            return Err(MappingError::InvalidRequest(
                "spec format requires at least one header".to_string(),
            ));
        }

        let model = self
            .router
            .select_model(&RoutingContext::new(&request.headers, &request.source_lang))
            .to_string();

        let key = CacheKey::scoped(&cache_scope(request), &request.headers);
        if let Some(cached) = self.cache.get(&key) {
            match remap_cached(&cached, &request.headers) {
                Some(result) => {
                    debug!(%model, "mapping served from cache");
                    return Ok(MappingRun {
                        result,
                        model: Some(model),
                        cache_hit: true,
                    });
                }
                None => warn!("cached mapping does not fit request headers, ignoring"),
            }
        }

        let ai_request = AiMappingRequest::from_request(model.clone(), request);
        let call = backend.map_columns(&ai_request);
        let response = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| MappingError::Timeout {
                    model: model.clone(),
                    timeout,
                })?,
            None => call.await,
        };
        let mut result = response.map_err(|source| MappingError::Backend {
            model: model.clone(),
            source,
        })?;

        result
            .validate_shape(request.column_count())
            .map_err(|source| MappingError::InvalidResponse {
                model: model.clone(),
                source,
            })?;
        normalize_meta(&mut result, request.column_count());

        info!(
            %model,
            mapped = result.meta.mapped_columns,
            unmapped = result.meta.unmapped_columns,
            "mapped columns"
        );

        self.cache.set(
            &key,
            CachedMapping {
                headers: request.headers.clone(),
                result: result.clone(),
            },
        );
        Ok(MappingRun {
            result,
            model: Some(model),
            cache_hit: false,
        })
    }
}

/// Deterministic table-mode mapping: every header becomes an extra column.
pub fn table_mapping(request: &MapColumnsRequest) -> ColumnMappingResult {
    let extra_columns = request
        .headers
        .iter()
        .enumerate()
        .map(|(column_index, header)| ExtraColumnMapping {
            name: header.clone(),
            semantic_role: TABLE_COLUMN_ROLE.to_string(),
            column_index,
            confidence: 1.0,
        })
        .collect();
    ColumnMappingResult {
        canonical_fields: Vec::new(),
        extra_columns,
        meta: MappingMeta {
            detected_type: "table".to_string(),
            source_language: request.source_lang.clone(),
            total_columns: request.column_count(),
            mapped_columns: 0,
            unmapped_columns: request.column_count(),
            avg_confidence: 0.0,
        },
    }
}

fn cache_scope(request: &MapColumnsRequest) -> String {
    [
        request.schema_hint.as_str(),
        request.file_type.as_str(),
        request.source_lang.as_str(),
    ]
    .map(|part| part.trim().to_lowercase())
    .join("|")
}

/// Overwrites derived counters that disagree with the validated entries.
fn normalize_meta(result: &mut ColumnMappingResult, column_count: usize) {
    let before = result.meta.clone();
    result.meta.total_columns = column_count;
    result.recompute_meta();
    if before != result.meta {
        debug!(
            reported_mapped = before.mapped_columns,
            reported_unmapped = before.unmapped_columns,
            "recomputed mapping counters from backend response"
        );
    }
}

/// Moves a cached result onto `headers`, which may be a permutation of the
/// cached headers with different case or whitespace.
///
/// Duplicate headers are matched by occurrence order.
fn remap_cached(cached: &CachedMapping, headers: &[String]) -> Option<ColumnMappingResult> {
    if cached.headers.len() != headers.len() {
        return None;
    }
    let mut free: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        free.entry(normalize_header(header))
            .or_default()
            .push_back(idx);
    }
    let positions = cached
        .headers
        .iter()
        .map(|header| free.get_mut(&normalize_header(header))?.pop_front())
        .collect::<Option<Vec<usize>>>()?;

    let mut result = cached.result.clone();
    for field in &mut result.canonical_fields {
        let new_index = *positions.get(field.column_index)?;
        field.column_index = new_index;
        field.source_header = headers[new_index].clone();
    }
    for extra in &mut result.extra_columns {
        let old_index = extra.column_index;
        let new_index = *positions.get(old_index)?;
        if normalize_header(&extra.name) == normalize_header(&cached.headers[old_index]) {
            extra.name = headers[new_index].clone();
        }
        extra.column_index = new_index;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colmap_model::CanonicalFieldMapping;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn table_mapping_keeps_every_header() {
        let request = MapColumnsRequest::new(strings(&["ID", "Name", "ID"]), MappingFormat::Table);
        let result = table_mapping(&request);
        assert!(result.canonical_fields.is_empty());
        assert_eq!(result.extra_columns.len(), 3);
        assert!(
            result
                .extra_columns
                .iter()
                .all(|e| e.semantic_role == TABLE_COLUMN_ROLE && e.confidence == 1.0)
        );
        assert_eq!(result.meta.detected_type, "table");
        assert_eq!(result.meta.mapped_columns, 0);
        assert_eq!(result.meta.unmapped_columns, 3);
        assert!(result.validate_shape(3).is_ok());
    }

    #[test]
    fn remap_follows_permutation_and_duplicates() {
        let cached = CachedMapping {
            headers: strings(&["ID", "Title", "Note", "Note"]),
            result: ColumnMappingResult {
                canonical_fields: vec![CanonicalFieldMapping {
                    canonical_name: "title".into(),
                    source_header: "Title".into(),
                    column_index: 1,
                    confidence: 0.9,
                    reasoning: String::new(),
                }],
                extra_columns: vec![
                    ExtraColumnMapping {
                        name: "ID".into(),
                        semantic_role: "identifier".into(),
                        column_index: 0,
                        confidence: 0.5,
                    },
                    ExtraColumnMapping {
                        name: "Note".into(),
                        semantic_role: "note".into(),
                        column_index: 2,
                        confidence: 0.5,
                    },
                    ExtraColumnMapping {
                        name: "Note".into(),
                        semantic_role: "note".into(),
                        column_index: 3,
                        confidence: 0.5,
                    },
                ],
                meta: MappingMeta::default(),
            },
        };
        let headers = strings(&["note", " TITLE ", "NOTE", "id"]);
        let result = remap_cached(&cached, &headers).expect("remapped");
        assert_eq!(result.canonical_fields[0].column_index, 1);
        assert_eq!(result.canonical_fields[0].source_header, " TITLE ");
        assert_eq!(result.extra_columns[0].column_index, 3);
        assert_eq!(result.extra_columns[0].name, "id");
        assert_eq!(result.extra_columns[1].column_index, 0);
        assert_eq!(result.extra_columns[2].column_index, 2);
        assert!(result.validate_shape(4).is_ok());
    }

    #[test]
    fn remap_rejects_different_headers() {
        let cached = CachedMapping {
            headers: strings(&["ID", "Title"]),
            result: ColumnMappingResult::default(),
        };
        assert!(remap_cached(&cached, &strings(&["ID", "Name"])).is_none());
        assert!(remap_cached(&cached, &strings(&["ID"])).is_none());
    }

    #[test]
    fn scope_ignores_case_and_whitespace() {
        let a = MapColumnsRequest::new(vec![], MappingFormat::Spec)
            .with_schema_hint("Test_Case ")
            .with_source_lang("EN");
        let b = MapColumnsRequest::new(vec![], MappingFormat::Spec)
            .with_schema_hint("test_case")
            .with_source_lang("en");
        assert_eq!(cache_scope(&a), cache_scope(&b));
    }
}
