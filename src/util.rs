//! Small utility helpers used across modules.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

/// Correlation id attached to every log line and error body of one request.
pub fn new_request_id() -> String {
  Uuid::new_v4().to_string()
}

/// Decode client-supplied base64 audio. Accepts an optional data-URL prefix
/// ("data:audio/webm;base64,...") since browsers produce that.
pub fn decode_audio_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
  let payload = match s.split_once(";base64,") {
    Some((prefix, rest)) if prefix.starts_with("data:") => rest,
    _ => s,
  };
  let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
  STANDARD.decode(compact)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with learner transcripts.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    format!("{}… ({} bytes total)", s.chars().take(max).collect::<String>(), s.len())
  }
}
