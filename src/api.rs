//! HTTP surface for ragline.
//!
//! A compact Axum router exposing the question-answering path:
//!
//! - `GET /api/ask?question=…` – Answer a question passed as a query parameter.
//! - `POST /api/ask` – Answer a question passed as `{"question": "…"}`.
//!
//! Both return the recorded answer (`timestamp`, `question`, `answer`). Errors come back as JSON
//! with an `error` message and `"status": "error"`.

use crate::ingest::stats::now_rfc3339;
use crate::retrieval::{AnswerApi, AnswerError, AnswerRecord};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the ask endpoint.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnswerApi + 'static,
{
    Router::new()
        .route("/api/ask", get(ask_query::<S>).post(ask_body::<S>))
        .with_state(service)
}

/// Query string or JSON body carrying the question.
#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

/// Answer a question supplied as `?question=`.
async fn ask_query<S>(
    State(service): State<Arc<S>>,
    Query(request): Query<AskRequest>,
) -> Result<Json<AnswerRecord>, AppError>
where
    S: AnswerApi,
{
    answer(service.as_ref(), request.question).await
}

/// Answer a question supplied as a JSON body.
///
/// The body is parsed by hand so malformed JSON maps to the documented error payload instead of
/// the extractor's default rejection.
async fn ask_body<S>(
    State(service): State<Arc<S>>,
    body: Bytes,
) -> Result<Json<AnswerRecord>, AppError>
where
    S: AnswerApi,
{
    let request: AskRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::BadRequest("Invalid JSON"))?;
    answer(service.as_ref(), request.question).await
}

async fn answer<S>(service: &S, question: Option<String>) -> Result<Json<AnswerRecord>, AppError>
where
    S: AnswerApi,
{
    let question = question.unwrap_or_default();
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("Question is required"));
    }

    tracing::info!(question, "Ask request received");
    let record = service.ask(question).await?;
    Ok(Json(record))
}

enum AppError {
    BadRequest(&'static str),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "status": "error" })),
            )
                .into_response(),
            Self::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Internal error: {message}"),
                    "status": "error",
                    "timestamp": now_rfc3339(),
                })),
            )
                .into_response(),
        }
    }
}

impl From<AnswerError> for AppError {
    fn from(inner: AnswerError) -> Self {
        match inner {
            AnswerError::EmptyQuestion => Self::BadRequest("Question is required"),
            other => {
                tracing::error!(error = %other, "Ask request failed");
                Self::Internal(other.to_string())
            }
        }
    }
}
