//! REST API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{LoadError, ServerError};
use crate::models::{ColumnDescriptor, TableModel};

/// `POST /api/transform` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    /// Panel configuration, validated against the panel schema.
    pub panel: Value,
    /// Raw datasets.
    #[serde(default)]
    pub data: Vec<Value>,
}

/// `POST /api/columns` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsRequest {
    pub transform: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Successful transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Unique request identifier, also written to the log stream.
    pub request_id: String,
    /// Always `"ok"`.
    pub status: String,
    pub table: TableModel,
    pub metadata: TableMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub transform: String,
    pub dataset_count: usize,
    pub column_count: usize,
    pub row_count: usize,
}

impl TransformResponse {
    pub fn new(request_id: String, transform: &str, dataset_count: usize, table: TableModel) -> Self {
        let metadata = TableMetadata {
            transform: transform.to_string(),
            dataset_count,
            column_count: table.column_count(),
            row_count: table.row_count(),
        };
        Self {
            request_id,
            status: "ok".to_string(),
            table,
            metadata,
        }
    }
}

/// Successful column description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub transform: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// One entry of `GET /api/transforms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformInfo {
    pub id: String,
    pub description: String,
}

/// New request identifier.
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Error category for a server error, as reported in error payloads.
pub fn error_kind(error: &ServerError) -> &'static str {
    match error {
        ServerError::Transform(e) | ServerError::Load(LoadError::Transform(e)) => e.kind(),
        ServerError::Load(LoadError::Schema { .. }) => "validation",
        ServerError::Load(_) | ServerError::BadRequest(_) => "request",
        ServerError::Io(_) => "internal",
    }
}

/// Detail lines for an error, e.g. each schema violation.
pub fn error_details(error: &ServerError) -> Vec<String> {
    match error {
        ServerError::Load(LoadError::Schema { errors }) => errors.clone(),
        _ => Vec::new(),
    }
}

/// Create an error response
pub fn error_response(kind: &str, error: &str, details: &[String]) -> Value {
    json!({
        "requestId": request_id(),
        "status": "error",
        "kind": kind,
        "error": error,
        "details": details,
        "table": {"columns": [], "rows": []},
    })
}
