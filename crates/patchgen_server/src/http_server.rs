use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use patchgen_core::{Catalog, EngineError, GenerateRequest, PatchEngine};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::storage::{PatchStorage, StorageError, with_unique_suffix};

// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PatchEngine>,
    pub storage: Arc<dyn PatchStorage>,
    pub public_url: String,
    pub unique_filenames: bool,
}

impl AppState {
    fn file_url(&self, name: &str) -> String {
        format!("{}/static/{}", self.public_url, name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub file_url: String,
    pub filename: String,
    pub modules: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Build the Axum router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/generate_vcv_patch", post(generate_patch))
        .route("/list_files", get(list_files))
        .route("/catalog", get(get_catalog))
        .route("/static/:name", get(get_file))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

// POST /generate_vcv_patch - Generate a patch and store it
async fn generate_patch(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let generated = state.engine.generate_file(&request)?;

    let filename = if state.unique_filenames {
        with_unique_suffix(&generated.file_name)
    } else {
        generated.file_name.clone()
    };
    let modules = generated.patch.modules.len();

    let storage = Arc::clone(&state.storage);
    let name = filename.clone();
    run_blocking(move || storage.write(&name, &generated.bytes)).await?;

    info!(
        style = %request.style,
        complexity = %request.complexity,
        modules,
        "Generated {}",
        filename
    );

    Ok(Json(GenerateResponse {
        file_url: state.file_url(&filename),
        filename,
        modules,
    }))
}

// GET /list_files - Names of stored patch files
async fn list_files(State(state): State<AppState>) -> Result<Json<ListFilesResponse>, AppError> {
    let storage = Arc::clone(&state.storage);
    let files = run_blocking(move || storage.list()).await?;
    Ok(Json(ListFilesResponse { files }))
}

// GET /catalog - The loaded module catalog
async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.engine.catalog().clone())
}

// GET /static/:name - Download a stored patch file
async fn get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let storage = Arc::clone(&state.storage);
    let bytes = run_blocking(move || storage.read(&name)).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// Storage does blocking file I/O; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Storage task failed: {}", e)))?
        .map_err(AppError::from)
}

// Error handling
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(_) => AppError::BadRequest(err.to_string()),
            StorageError::NotFound(_) => AppError::NotFound(err.to_string()),
            StorageError::Io(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
