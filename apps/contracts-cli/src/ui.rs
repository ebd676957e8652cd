//! Browser UI: one HTML page plus the JSON endpoints it calls.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use contracts_core::config::sanitize_collection_name;
use contracts_core::{CollectionStats, Error, ErrorKind};
use contracts_rag::{CollectionInfo, IngestMode, IngestReport, Retrieved, Services};

const TRACING_TARGET: &str = "contracts::ui";

/// Upload size cap for `POST /api/ingest`.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
    // a rebuild drops the collection first, so uploads run one at a time
    ingest_lock: Arc<Mutex<()>>,
}

pub fn router(services: Arc<Services>) -> Router {
    let state = AppState { services, ingest_lock: Arc::new(Mutex::new(())) };
    Router::new()
        .route("/", get(index))
        .route("/api/collections", get(list_collections))
        .route("/api/collections/{name}", get(collection_info))
        .route("/api/collections/{name}/retrieve", post(retrieve))
        .route("/api/collections/{name}/rag", post(rag))
        .route("/api/ingest", post(ingest))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Service(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, name, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            Self::Service(err) => {
                let (status, name) = match (&err, err.kind()) {
                    (Error::CollectionNotFound(_), _) => (StatusCode::NOT_FOUND, "not_found"),
                    (_, ErrorKind::Configuration) => (StatusCode::BAD_REQUEST, "configuration"),
                    (_, ErrorKind::Ingestion) => (StatusCode::UNPROCESSABLE_ENTITY, "ingestion"),
                    (_, ErrorKind::ExternalService) => (StatusCode::BAD_GATEWAY, "external_service"),
                    (_, ErrorKind::Store | ErrorKind::Io) => (StatusCode::INTERNAL_SERVER_ERROR, "store"),
                };
                if status.is_server_error() {
                    tracing::error!(target: TRACING_TARGET, error = %err, "request failed");
                } else {
                    tracing::warn!(target: TRACING_TARGET, error = %err, "request rejected");
                }
                (status, name, err.to_string())
            }
        };
        (status, Json(json!({ "error": name, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub collection: String,
    pub results: Vec<Retrieved>,
}

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub question: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Retrieved>,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_collections(State(state): State<AppState>) -> ApiResult<Vec<CollectionStats>> {
    Ok(Json(state.services.list_collections().await?))
}

async fn collection_info(State(state): State<AppState>, UrlPath(name): UrlPath<String>) -> ApiResult<CollectionInfo> {
    Ok(Json(state.services.collection_info(&name).await?))
}

fn non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

async fn retrieve(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
    Json(req): Json<RetrieveRequest>,
) -> ApiResult<RetrieveResponse> {
    non_empty("query", &req.query)?;
    let hits = state.services.retrieval().await?.retrieve(&name, req.query.trim(), req.k).await?;
    Ok(Json(RetrieveResponse { collection: name, results: Retrieved::rows(&hits) }))
}

async fn rag(State(state): State<AppState>, UrlPath(name): UrlPath<String>, Json(req): Json<RagRequest>) -> ApiResult<RagResponse> {
    non_empty("question", &req.question)?;
    let answer = state.services.rag().await?.answer(&name, req.question.trim(), req.k).await?;
    Ok(Json(RagResponse { answer: answer.answer, sources: Retrieved::rows(&answer.context) }))
}

/// Multipart fields: `file` (the PDF) and an optional `collection`. The
/// collection defaults to the upload's file stem and is always rebuilt.
async fn ingest(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<IngestReport> {
    let mut collection: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart data: {e}")))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("collection") => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest(format!("invalid collection field: {e}")))?;
                collection = Some(text).filter(|t| !t.trim().is_empty());
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .and_then(|n| Path::new(n).file_name())
                    .map_or_else(|| "upload.pdf".to_string(), |n| n.to_string_lossy().to_string());
                let data = field.bytes().await.map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
                upload = Some((file_name, data.to_vec()));
            }
            other => tracing::debug!(target: TRACING_TARGET, field = ?other, "ignoring multipart field"),
        }
    }

    let (file_name, data) = upload.ok_or_else(|| ApiError::BadRequest("missing `file` field".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }
    let collection = match collection {
        Some(name) => sanitize_collection_name(&name),
        None => sanitize_collection_name(&Path::new(&file_name).file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()),
    };

    let tmp = tempfile::Builder::new().prefix("upload-").suffix(".pdf").tempfile().map_err(Error::from)?;
    tokio::fs::write(tmp.path(), &data).await.map_err(Error::from)?;
    tracing::info!(target: TRACING_TARGET, file = %file_name, bytes = data.len(), collection = %collection, "received upload");

    let _guard = state.ingest_lock.lock().await;
    let ingestor = state.services.ingestor().await?;
    let report = ingestor.ingest_as(tmp.path(), &file_name, &collection, IngestMode::Rebuild).await?;
    Ok(Json(report))
}
