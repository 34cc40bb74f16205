//! Speech-to-text collaborator.
//!
//! The adapter depends on the `Transcriber` trait; `OpenAiTranscriber` is the
//! production implementation calling `audio/transcriptions` with a multipart
//! upload. We ask for `verbose_json` because it carries the clip duration,
//! which fluency needs.
//!
//! NOTE: We never log the API key or audio bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::TranscriptionError;

/// Formats the transcription endpoint accepts, by MIME subtype / extension.
pub const SUPPORTED_FORMATS: &[&str] = &[
  "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Raw audio as uploaded by the client. Never transcoded here.
#[derive(Clone, Debug)]
pub struct AudioClip {
  pub bytes: Vec<u8>,
  pub mime: String,
}

impl AudioClip {
  /// File extension derived from the MIME type ("audio/webm;codecs=opus" -> "webm").
  pub fn extension(&self) -> Option<&'static str> {
    let subtype = self
      .mime
      .split(';')
      .next()
      .unwrap_or_default()
      .trim()
      .rsplit('/')
      .next()
      .unwrap_or_default()
      .to_ascii_lowercase();
    let subtype = match subtype.as_str() {
      "x-wav" | "wave" | "vnd.wave" => "wav",
      "x-m4a" | "aac" => "m4a",
      "x-flac" => "flac",
      other => other,
    }
    .to_string();
    SUPPORTED_FORMATS.iter().copied().find(|f| *f == subtype)
  }

  /// Reject clips the endpoint would refuse anyway, before any network call.
  pub fn validate(&self) -> Result<&'static str, TranscriptionError> {
    if self.bytes.is_empty() {
      return Err(TranscriptionError::EmptyAudio);
    }
    self
      .extension()
      .ok_or_else(|| TranscriptionError::UnsupportedFormat(self.mime.clone()))
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
  pub text: String,
  /// Clip length as measured by the transcription service, if reported.
  pub duration_seconds: Option<f64>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
  async fn transcribe(&self, clip: &AudioClip, language: &str) -> Result<Transcript, TranscriptionError>;
}

#[derive(Clone)]
pub struct OpenAiTranscriber {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub transcribe_model: String,
}

#[derive(Deserialize)]
struct VerboseTranscription {
  text: String,
  #[serde(default)]
  duration: Option<f64>,
}

impl OpenAiTranscriber {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let transcribe_model =
      std::env::var("OPENAI_TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".into());

    // Upper bound only; the adapter applies its own per-attempt timeout.
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, transcribe_model })
  }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
  #[instrument(level = "info", skip(self, clip), fields(model = %self.transcribe_model, mime = %clip.mime, bytes = clip.bytes.len(), %language))]
  async fn transcribe(&self, clip: &AudioClip, language: &str) -> Result<Transcript, TranscriptionError> {
    let ext = clip.validate()?;
    let url = format!("{}/audio/transcriptions", self.base_url);

    let part = reqwest::multipart::Part::bytes(clip.bytes.clone())
      .file_name(format!("audio.{ext}"))
      .mime_str(&clip.mime)
      .map_err(|_| TranscriptionError::UnsupportedFormat(clip.mime.clone()))?;
    let form = reqwest::multipart::Form::new()
      .text("model", self.transcribe_model.clone())
      .text("language", language.to_string())
      .text("response_format", "verbose_json")
      .part("file", part);

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "speakup-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(TranscriptionError::Http { status, message });
    }

    let body: VerboseTranscription = res
      .json()
      .await
      .map_err(|e| TranscriptionError::Decode(e.to_string()))?;
    info!(elapsed = ?start.elapsed(), text_len = body.text.len(), duration = ?body.duration, "Transcription received");

    Ok(Transcript { text: body.text.trim().to_string(), duration_seconds: body.duration })
  }
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
