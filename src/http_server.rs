//! HTTP server implementation using Axum.

use crate::error::ApiError;
use crate::exec;
use crate::files::{self, ListItem};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, Request, State},
    middleware::{self, Next},
    response::{Html, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "x-sandbox-token";

/// Request bodies larger than this are rejected; uploads are the only
/// payloads that get anywhere near it.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Self-contained browser file manager served at `/ui`.
const UI_PAGE: &str = include_str!("ui.html");

// Request/Response types
#[derive(Deserialize)]
struct ExecuteRequest {
    command: String,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

#[derive(Deserialize)]
struct RunCodeRequest {
    language: String,
    code: String,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

fn default_timeout() -> u64 { 30 }

#[derive(Deserialize)]
struct WriteRequest {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_list_path")]
    path: String,
}

fn default_list_path() -> String { ".".to_string() }

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    workspace: String,
    auth_enabled: bool,
}

#[derive(Serialize)]
struct ExecuteResponse {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

#[derive(Serialize)]
struct RunCodeResponse {
    stdout: String,
    stderr: String,
    exit_code: i32,
    temp_file: String,
}

#[derive(Serialize)]
struct WriteResponse {
    status: String,
    path: String,
}

#[derive(Serialize)]
struct ReadResponse {
    content: String,
}

#[derive(Serialize)]
struct ListResponse {
    path: String,
    items: Vec<ListItem>,
}

#[derive(Serialize)]
struct DeleteResponse {
    status: String,
    deleted: String,
}

#[derive(Serialize)]
struct UploadResponse {
    path: String,
    size: u64,
}

/// Build the service router around the shared state.
///
/// Everything that can execute code or touch files sits behind the token
/// check; `/`, `/ui` and `/public/*` stay open.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/execute", post(execute))
        .route("/run_code", post(run_code))
        .route("/write", post(write_file))
        .route("/read", get(read_file))
        .route("/list", get(list_dir))
        .route("/delete", delete(delete_path))
        .route("/upload", post(upload))
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/", get(status))
        .route("/ui", get(ui_page))
        .nest_service("/public", ServeDir::new(state.config.public_dir()))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server on the given port with the provided state.
pub async fn run_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Reject any request whose `X-Sandbox-Token` header is not exactly the
/// configured secret. Runs before the protected handlers, so a failed check
/// leaves no side effects behind.
async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let supplied = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if supplied != Some(state.config.token.as_str()) {
        return Err(ApiError::Forbidden("Invalid X-Sandbox-Token".to_string()));
    }
    Ok(next.run(req).await)
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
        workspace: state.config.workspace.display().to_string(),
        auth_enabled: true,
    })
}

async fn ui_page() -> Html<&'static str> {
    Html(UI_PAGE)
}

async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let outcome = exec::run_shell(&req.command, &state.config.workspace, req.timeout).await?;
    Ok(Json(ExecuteResponse {
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        exit_code: outcome.exit_code,
    }))
}

async fn run_code(
    State(state): State<AppState>,
    Json(req): Json<RunCodeRequest>,
) -> Result<Json<RunCodeResponse>, ApiError> {
    let (outcome, temp_file) = exec::run_script(
        &req.language,
        &req.code,
        &state.config.workspace,
        req.timeout,
        state.config.keep_temp_files,
    )
    .await?;
    Ok(Json(RunCodeResponse {
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        exit_code: outcome.exit_code,
        temp_file,
    }))
}

async fn write_file(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>, ApiError> {
    let full = files::write_file(&state.config, &req.path, &req.content).await?;
    Ok(Json(WriteResponse {
        status: "success".to_string(),
        path: full.display().to_string(),
    }))
}

async fn read_file(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ReadResponse>, ApiError> {
    let content = files::read_file(&state.config, &query.path).await?;
    Ok(Json(ReadResponse { content }))
}

async fn list_dir(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let items = files::list_dir(&state.config, &query.path).await?;
    Ok(Json(ListResponse {
        path: query.path,
        items,
    }))
}

async fn delete_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let full = files::delete_path(&state.config, &query.path).await?;
    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        deleted: full.display().to_string(),
    }))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut subdir: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "upload.bin".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
                file = Some((filename, data));
            }
            "subdir" => {
                subdir = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read subdir field: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let (filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    let (path, size) =
        files::store_upload(&state.config, subdir.as_deref(), &filename, &data).await?;
    Ok(Json(UploadResponse { path, size }))
}
