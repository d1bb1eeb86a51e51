use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, routing::post, Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::task;
use tracing::{error, info};

use ragbench_core::{save_json, Insight};
use ragbench_rag::{ContextEntry, QueryContext, QueryRecord};

pub const QUERY_LOG_FILE: &str = "task_11.json";

pub struct AppState {
    ctx: QueryContext,
    output_path: PathBuf,
    write_lock: Mutex<()>,
}

impl AppState {
    pub fn new(ctx: QueryContext, output_path: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            output_path: output_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    fn persist(&self, record: &QueryRecord) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock();
        save_json(record, &self.output_path)?;
        Ok(())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_ui))
        .route("/query", post(handle_query))
        .route("/reload", post(handle_reload))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("../../../ui/index.html"))
}

#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    insights: Vec<Insight>,
    retrieved_chunks: Vec<ContextEntry>,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    chunks: usize,
}

/// The body is read as JSON whatever its content type; an unreadable body
/// counts as a blank query.
async fn handle_query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QueryResponse>, AppError> {
    let request: QueryRequest = serde_json::from_slice(&body).unwrap_or_default();
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::bad_request("Please provide a query."));
    }
    let state = state.clone();
    let response = task::spawn_blocking(move || answer_and_record(&state, &query))
        .await
        .map_err(AppError::internal)??;
    Ok(Json(response))
}

fn answer_and_record(state: &AppState, query: &str) -> Result<QueryResponse, AppError> {
    let answer = state.ctx.answer(query)?;
    state.persist(&QueryRecord::new(query, &answer))?;
    info!(
        insights = answer.insights.len(),
        retrieved = answer.retrieved_chunks.len(),
        output = %state.output_path.display(),
        "query served"
    );
    Ok(QueryResponse {
        insights: answer.insights,
        retrieved_chunks: answer.retrieved_chunks,
    })
}

async fn handle_reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, AppError> {
    let state = state.clone();
    let chunks = task::spawn_blocking(move || state.ctx.reload())
        .await
        .map_err(AppError::internal)??;
    Ok(Json(ReloadResponse { chunks }))
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}
