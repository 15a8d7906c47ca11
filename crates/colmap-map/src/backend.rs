//! Contract for the AI mapping backend.
//!
//! The backend client owns networking, retries and backoff. This crate only
//! issues one call per cache miss and validates what comes back.

use async_trait::async_trait;
use colmap_model::{ColumnMappingResult, MapColumnsRequest, MappingFormat};

/// Error type returned by backend implementations.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the backend needs for one structured mapping call.
#[derive(Debug, Clone, PartialEq)]
pub struct AiMappingRequest {
    /// Model chosen by the router.
    pub model: String,
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub format: MappingFormat,
    pub file_type: String,
    pub source_lang: String,
    pub schema_hint: String,
}

impl AiMappingRequest {
    pub fn from_request(model: impl Into<String>, request: &MapColumnsRequest) -> Self {
        Self {
            model: model.into(),
            headers: request.headers.clone(),
            sample_rows: request.sample_rows.clone(),
            format: request.format,
            file_type: request.file_type.clone(),
            source_lang: request.source_lang.clone(),
            schema_hint: request.schema_hint.clone(),
        }
    }
}

/// A structured mapping backend.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Maps the request headers onto canonical fields and extra columns.
    async fn map_columns(
        &self,
        request: &AiMappingRequest,
    ) -> Result<ColumnMappingResult, BackendError>;
}
