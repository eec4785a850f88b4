//! HTTP API over a built knowledge base.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/status` | Knowledge base state and indexing coverage |
//! | `POST` | `/ask` | Free-text answer grounded in the top `k` sections |
//! | `POST` | `/analyze` | Structured classification of a complaint |
//! | `POST` | `/draft` | Draft a report from a narrative and its analysis |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_ready` (409), `upstream` (502),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use nyaya_core::analysis::{
    AnalysisProvider, AnalysisRequest, Attachment, DraftingProvider, LegalAnalysis,
};
use nyaya_core::embedding::EmbeddingProvider;
use nyaya_core::error::CoreError;
use nyaya_core::query::{draft_report, QueryOutcome};
use nyaya_core::session::{KbState, KnowledgeBase};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub kb: Arc<RwLock<KnowledgeBase>>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub analyzer: Arc<dyn AnalysisProvider>,
    pub drafter: Arc<dyn DraftingProvider>,
    /// Used when a request does not carry `top_k`.
    pub top_k: usize,
}

/// Build the router. Exposed separately from [`run_server`] so it can be
/// served on any listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/ask", post(handle_ask))
        .route("/analyze", post(handle_analyze))
        .route("/draft", post(handle_draft))
        .layer(cors)
        .with_state(state)
}

/// Bind `bind_addr` and serve until the process is terminated.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(bind = %bind_addr, "server listening");
    println!("Nyaya server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::EmptyQuery | CoreError::InvalidBatchSize => bad_request(message),
            CoreError::NotReady | CoreError::NoSections => {
                app_error(StatusCode::CONFLICT, "not_ready", message)
            }
            CoreError::QueryEmbedding(_) | CoreError::Analysis(_) | CoreError::Drafting(_) => {
                app_error(StatusCode::BAD_GATEWAY, "upstream", message)
            }
            CoreError::DuplicateChunk(_)
            | CoreError::MissingChunk(_)
            | CoreError::DimensionMismatch { .. } => {
                tracing::error!(error = %message, "index integrity error");
                app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

fn resolve_top_k(requested: Option<usize>, default: usize) -> Result<usize, AppError> {
    match requested {
        Some(0) => Err(bad_request("top_k must be >= 1")),
        Some(k) => Ok(k),
        None => Ok(default),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    state: KbState,
    sections: usize,
    indexed: usize,
    failed: Vec<String>,
    embedding_model: String,
    embedding_dims: usize,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let kb = state.kb.read().await;
    let failed = kb
        .last_report()
        .map(|r| r.failed.iter().map(|f| f.id.clone()).collect())
        .unwrap_or_default();
    Json(StatusResponse {
        state: kb.state(),
        sections: kb.chunks().len(),
        indexed: kb.index().len(),
        failed,
        embedding_model: state.embedder.model_name().to_string(),
        embedding_dims: state.embedder.dims(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<QueryOutcome>, AppError> {
    let k = resolve_top_k(req.top_k, state.top_k)?;
    let kb = state.kb.read().await;
    let outcome = kb
        .ask(state.embedder.as_ref(), state.analyzer.as_ref(), &req.query, k)
        .await?;
    Ok(Json(outcome))
}

// ============ POST /analyze ============

/// Attachment as it arrives over the wire: base64 payload.
#[derive(Deserialize)]
struct AttachmentBody {
    mime_type: String,
    data: String,
}

impl AttachmentBody {
    fn decode(self, field: &str) -> Result<Attachment, AppError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| bad_request(format!("{}.data is not valid base64: {}", field, e)))?;
        Ok(Attachment {
            mime_type: self.mime_type,
            data,
        })
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    narrative: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    audio: Option<AttachmentBody>,
    #[serde(default)]
    image: Option<AttachmentBody>,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<QueryOutcome>, AppError> {
    let k = resolve_top_k(req.top_k, state.top_k)?;
    let request = AnalysisRequest {
        narrative: req.narrative,
        audio: req.audio.map(|a| a.decode("audio")).transpose()?,
        image: req.image.map(|a| a.decode("image")).transpose()?,
    };
    let kb = state.kb.read().await;
    let outcome = kb
        .classify(state.embedder.as_ref(), state.analyzer.as_ref(), &request, k)
        .await?;
    Ok(Json(outcome))
}

// ============ POST /draft ============

#[derive(Deserialize)]
struct DraftRequest {
    narrative: String,
    analysis: LegalAnalysis,
}

#[derive(Serialize)]
struct DraftResponse {
    report: String,
}

async fn handle_draft(
    State(state): State<AppState>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let report = draft_report(state.drafter.as_ref(), &req.narrative, &req.analysis).await?;
    Ok(Json(DraftResponse { report }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::EmptyQuery, StatusCode::BAD_REQUEST, "bad_request"),
            (CoreError::NotReady, StatusCode::CONFLICT, "not_ready"),
            (
                CoreError::QueryEmbedding("HTTP 503".to_string()),
                StatusCode::BAD_GATEWAY,
                "upstream",
            ),
            (
                CoreError::Drafting("quota".to_string()),
                StatusCode::BAD_GATEWAY,
                "upstream",
            ),
            (
                CoreError::DimensionMismatch {
                    chunk_id: "chunk-0".to_string(),
                    query: 3,
                    stored: 768,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];
        for (err, status, code) in cases {
            let app = AppError::from(err);
            assert_eq!(app.status, status);
            assert_eq!(app.code, code);
        }
    }

    #[test]
    fn test_top_k_resolution() {
        assert_eq!(resolve_top_k(None, 4).unwrap(), 4);
        assert_eq!(resolve_top_k(Some(2), 4).unwrap(), 2);
        assert_eq!(resolve_top_k(Some(0), 4).unwrap_err().code, "bad_request");
    }

    #[test]
    fn test_attachment_decoding() {
        let ok = AttachmentBody {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        }
        .decode("image")
        .unwrap();
        assert_eq!(ok.data, b"hello");

        let err = AttachmentBody {
            mime_type: "audio/webm".to_string(),
            data: "not base64!".to_string(),
        }
        .decode("audio")
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("audio.data"));
    }
}
