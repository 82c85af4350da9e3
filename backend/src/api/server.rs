//! HTTP server for the table transform API.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | GET    | `/api/transforms` | Registered transforms                    |
//! | POST   | `/api/columns`    | Columns selectable for some datasets     |
//! | POST   | `/api/transform`  | Datasets + panel config → table          |
//! | POST   | `/api/upload`     | Same, from multipart `panel`/`data` files|
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{
    error_details, error_kind, error_response, request_id, ColumnsRequest, ColumnsResponse,
    TransformInfo, TransformRequest, TransformResponse,
};
use crate::error::{LoadError, ServerError, ServerResult, TransformError};
use crate::input::{datasets_from_bytes, table_from_csv};
use crate::transform::{describe_columns, transform_values, TransformRegistry};

type ApiError = (StatusCode, Json<Value>);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TransformRegistry>,
}

impl AppState {
    pub fn new(registry: TransformRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transforms", get(list_transforms))
        .route("/api/columns", post(columns))
        .route("/api/transform", post(transform))
        .route("/api/upload", post(upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, registry: TransformRegistry) -> ServerResult<()> {
    let app = router(AppState::new(registry));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    eprintln!("🚀 Tablemerge server running on http://localhost:{}", port);
    eprintln!("   GET  /api/transforms - Registered transforms");
    eprintln!("   POST /api/columns    - Describe columns");
    eprintln!("   POST /api/transform  - Transform datasets");
    eprintln!("   POST /api/upload     - Transform uploaded files");
    eprintln!("   GET  /api/logs       - SSE log stream");
    eprintln!("   GET  /health         - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP status for a failed request.
pub fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::Transform(TransformError::NotFound(_))
        | ServerError::Load(LoadError::Transform(TransformError::NotFound(_))) => {
            StatusCode::NOT_FOUND
        }
        ServerError::Transform(_) | ServerError::Load(LoadError::Transform(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServerError::Load(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: impl Into<ServerError>) -> ApiError {
    let error = error.into();
    let body = error_response(error_kind(&error), &error.to_string(), &error_details(&error));
    (status_for(&error), Json(body))
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tablemerge",
        "version": env!("CARGO_PKG_VERSION"),
        "transforms": state.registry.len(),
        "endpoints": {
            "transforms": "GET /api/transforms",
            "columns": "POST /api/columns",
            "transform": "POST /api/transform",
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_transforms(State(state): State<AppState>) -> Json<Vec<TransformInfo>> {
    Json(
        state
            .registry
            .list()
            .into_iter()
            .map(|(id, description)| TransformInfo {
                id: id.to_string(),
                description: description.to_string(),
            })
            .collect(),
    )
}

async fn columns(
    State(state): State<AppState>,
    Json(request): Json<ColumnsRequest>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let columns = describe_columns(&state.registry, &request.transform, &request.data).map_err(reject)?;
    Ok(Json(ColumnsResponse {
        transform: request.transform,
        columns,
    }))
}

async fn transform(
    State(state): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, ApiError> {
    run_transform(&state, &request.panel, request.data)
}

/// Multipart upload: a `panel` JSON file plus one or more `data` files
/// (JSON arrays of datasets, or CSV tables).
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TransformResponse>, ApiError> {
    let mut panel: Option<Value> = None;
    let mut data: Vec<Value> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        let name = field.name().unwrap_or("").to_string();
        let is_csv = field
            .file_name()
            .is_some_and(|f| f.to_ascii_lowercase().ends_with(".csv"));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?;

        match name.as_str() {
            "panel" => {
                let value = serde_json::from_slice(&bytes).map_err(|e| reject(LoadError::Json(e)))?;
                panel = Some(value);
            }
            "data" if is_csv => data.push(table_from_csv(&bytes).map_err(reject)?),
            "data" => data.extend(datasets_from_bytes(&bytes).map_err(reject)?),
            _ => {}
        }
    }

    let panel = panel.ok_or_else(|| reject(ServerError::BadRequest("No panel provided".to_string())))?;
    run_transform(&state, &panel, data)
}

fn run_transform(
    state: &AppState,
    panel: &Value,
    data: Vec<Value>,
) -> Result<Json<TransformResponse>, ApiError> {
    let id = request_id();
    log_info(format!("Request {}", id));

    let table = transform_values(&state.registry, &data, panel).map_err(reject)?;
    let transform = panel["transform"].as_str().unwrap_or_default();

    Ok(Json(TransformResponse::new(id, transform, data.len(), table)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = ServerError::from(TransformError::NotFound("x".into()));
        assert_eq!(status_for(&not_found), StatusCode::NOT_FOUND);

        let nested = ServerError::from(LoadError::Transform(TransformError::NotFound("x".into())));
        assert_eq!(status_for(&nested), StatusCode::NOT_FOUND);

        let format = ServerError::from(TransformError::Format("f".into()));
        assert_eq!(status_for(&format), StatusCode::UNPROCESSABLE_ENTITY);

        let schema = ServerError::from(LoadError::Schema { errors: vec![] });
        assert_eq!(status_for(&schema), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_run_transform() {
        let state = AppState::new(TransformRegistry::new());
        let panel = json!({"transform": "timeseries_to_rows"});
        let data = vec![json!({"target": "cpu", "datapoints": [[1, 1000]]})];
        let Json(response) = run_transform(&state, &panel, data).unwrap();
        assert_eq!(response.metadata.row_count, 1);
        assert_eq!(response.metadata.transform, "timeseries_to_rows");
    }

    #[test]
    fn test_run_transform_rejects_unknown() {
        let state = AppState::new(TransformRegistry::new());
        let (status, Json(body)) = run_transform(&state, &json!({"transform": "pivot"}), vec![]).unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "configuration");
    }
}
