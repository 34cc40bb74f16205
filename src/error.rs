//! Error taxonomy shared by the analysis engine, the transcription client and
//! the question bank. Each error exposes a stable `kind()` used in logs and in
//! HTTP error bodies.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Unknown difficulty tier: {0}")]
  UnknownTier(String),

  #[error("Invalid duration: {0} seconds (must be a positive number)")]
  InvalidDuration(f64),

  #[error("Transcription failed: {0}")]
  Transcription(#[from] TranscriptionError),

  #[error("Configuration error: {0}")]
  Config(String),
}

impl AnalysisError {
  pub fn kind(&self) -> &'static str {
    match self {
      AnalysisError::InvalidInput(_) => "invalid_input",
      AnalysisError::UnknownTier(_) => "unknown_tier",
      AnalysisError::InvalidDuration(_) => "invalid_duration",
      AnalysisError::Transcription(e) => e.kind(),
      AnalysisError::Config(_) => "config",
    }
  }
}

#[derive(Debug, Error)]
pub enum TranscriptionError {
  #[error("speech-to-text is not configured (no OPENAI_API_KEY)")]
  Unavailable,

  #[error("audio clip is empty")]
  EmptyAudio,

  #[error("unsupported audio format: {0}")]
  UnsupportedFormat(String),

  #[error("transcription timed out")]
  Timeout,

  #[error("transcription HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("network error: {0}")]
  Network(String),

  #[error("could not decode transcription response: {0}")]
  Decode(String),
}

impl TranscriptionError {
  pub fn kind(&self) -> &'static str {
    match self {
      TranscriptionError::Unavailable => "transcription_unavailable",
      TranscriptionError::EmptyAudio => "transcription_empty_audio",
      TranscriptionError::UnsupportedFormat(_) => "transcription_unsupported_format",
      TranscriptionError::Timeout => "transcription_timeout",
      TranscriptionError::Http { .. } => "transcription_http",
      TranscriptionError::Network(_) => "transcription_network",
      TranscriptionError::Decode(_) => "transcription_decode",
    }
  }

  /// Worth another attempt: transient network trouble or a server-side hiccup.
  pub fn is_retryable(&self) -> bool {
    match self {
      TranscriptionError::Timeout | TranscriptionError::Network(_) => true,
      TranscriptionError::Http { status, .. } => *status == 429 || *status >= 500,
      _ => false,
    }
  }
}

impl From<reqwest::Error> for TranscriptionError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      TranscriptionError::Timeout
    } else if e.is_decode() {
      TranscriptionError::Decode(e.to_string())
    } else {
      TranscriptionError::Network(e.to_string())
    }
  }
}

#[derive(Debug, Error)]
pub enum QuestionError {
  #[error("no active questions available for {0}")]
  NoQuestions(String),
}

impl QuestionError {
  pub fn kind(&self) -> &'static str {
    match self {
      QuestionError::NoQuestions(_) => "no_questions",
    }
  }
}

/// Anything a request handler can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error(transparent)]
  Analysis(#[from] AnalysisError),

  #[error(transparent)]
  Questions(#[from] QuestionError),
}

impl ServiceError {
  pub fn kind(&self) -> &'static str {
    match self {
      ServiceError::Analysis(e) => e.kind(),
      ServiceError::Questions(e) => e.kind(),
    }
  }
}

/// A handler failure tagged with the request's correlation id.
#[derive(Debug, Error)]
#[error("[{request_id}] {error}")]
pub struct ApiError {
  pub request_id: String,
  pub error: ServiceError,
}

impl ApiError {
  pub fn new(request_id: &str, error: impl Into<ServiceError>) -> Self {
    Self { request_id: request_id.to_string(), error: error.into() }
  }

  pub fn kind(&self) -> &'static str {
    self.error.kind()
  }
}
