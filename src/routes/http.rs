//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented, mints the request's correlation id and logs
//! basic result info.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};

use crate::error::{AnalysisError, ApiError, QuestionError, ServiceError, TranscriptionError};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;
use crate::util::new_request_id;

/// HTTP status for each error kind.
pub fn status_for(error: &ServiceError) -> StatusCode {
  match error {
    ServiceError::Analysis(e) => match e {
      AnalysisError::InvalidInput(_) | AnalysisError::InvalidDuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AnalysisError::UnknownTier(_) => StatusCode::BAD_REQUEST,
      AnalysisError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AnalysisError::Transcription(t) => match t {
        TranscriptionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        TranscriptionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        TranscriptionError::EmptyAudio | TranscriptionError::UnsupportedFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TranscriptionError::Http { .. } | TranscriptionError::Network(_) | TranscriptionError::Decode(_) => StatusCode::BAD_GATEWAY,
      },
    },
    ServiceError::Questions(QuestionError::NoQuestions(_)) => StatusCode::NOT_FOUND,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status_for(&self.error);
    if status.is_server_error() {
      error!(target: "speakup_backend", request_id = %self.request_id, kind = self.kind(), %status, error = %self.error, "Request failed");
    } else {
      info!(target: "speakup_backend", request_id = %self.request_id, kind = self.kind(), %status, "Request rejected");
    }
    let body = ErrorOut {
      kind: self.kind().to_string(),
      message: self.error.to_string(),
      request_id: self.request_id,
    };
    (status, Json(body)).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// A missing or unreadable body is treated like an empty request, so the
/// adapter analyses the default sample.
#[instrument(level = "info", skip_all)]
pub async fn http_post_text_analyzer(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<TextAnalysisIn>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
  let request_id = new_request_id();
  let body = match payload {
    Ok(Json(body)) => body,
    Err(rejection) => {
      warn!(target: "analysis", %request_id, reason = %rejection.body_text(), "Unreadable text analyzer body; using defaults");
      TextAnalysisIn::default()
    }
  };
  info!(
    target: "analysis",
    %request_id,
    text_len = body.text.as_ref().map_or(0, |t| t.len()),
    difficulty = ?body.difficulty,
    "Text analyzer initiated"
  );
  let report = analyze_text(&state, &request_id, body).await?;
  info!(target: "analysis", %request_id, "Text analysis complete, sending response");
  Ok(Json(report))
}

#[instrument(level = "info", skip(state, body), fields(mime = %body.mime, audio_b64_len = body.audio_base64.len(), difficulty = ?body.difficulty))]
pub async fn http_post_audio_analyzer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AudioAnalysisIn>,
) -> Result<impl IntoResponse, ApiError> {
  let request_id = new_request_id();
  info!(target: "analysis", %request_id, "Audio analyzer initiated");
  let report = analyze_audio(&state, &request_id, body).await?;
  info!(target: "analysis", %request_id, "Audio analysis complete, sending response");
  Ok(Json(report))
}

#[instrument(level = "info", skip(state), fields(first_time = ?q.first_time))]
pub async fn http_get_questions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
  let request_id = new_request_id();
  let out = next_questions(&state, &request_id, q).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_questions_config(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuestionsConfigIn>,
) -> impl IntoResponse {
  Json(update_questions_config(&state, body).await)
}
