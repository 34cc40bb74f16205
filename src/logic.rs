//! Request adapter: core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Text analysis (default sample + default tier substitution)
//!   - Audio analysis (transcription with timeout/retry, then analysis)
//!   - Question selection and runtime config updates
//!
//! Each function takes an explicit input struct, returns an explicit output
//! struct, and tags failures with the request's correlation id.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::analyzer::{AnalysisReport, AnalysisRequest, DEFAULT_TEXT};
use crate::config::TranscriptionConfig;
use crate::domain::{Question, QuestionsConfig, SearchStrategy};
use crate::error::{AnalysisError, ApiError, TranscriptionError};
use crate::openai::{AudioClip, Transcriber, Transcript};
use crate::protocol::{AudioAnalysisIn, QuestionOut, QuestionsConfigIn, QuestionsOut, QuestionsQuery, TextAnalysisIn};
use crate::questions::{first_time_questions, select_questions};
use crate::state::AppState;
use crate::thresholds::Tier;
use crate::util::{decode_audio_base64, trunc_for_log};

/// Text to analyse: the supplied text, or the default sample when it is
/// missing or blank.
pub fn resolve_text(raw: Option<String>, request_id: &str) -> String {
  match raw {
    Some(t) if !t.trim().is_empty() => t,
    other => {
      let e = AnalysisError::InvalidInput(if other.is_some() { "blank text".into() } else { "no text".into() });
      warn!(target: "analysis", %request_id, kind = e.kind(), reason = %e, "Substituting default sample text");
      DEFAULT_TEXT.to_string()
    }
  }
}

#[instrument(level = "info", skip(state, input), fields(%request_id))]
pub async fn analyze_text(state: &AppState, request_id: &str, input: TextAnalysisIn) -> Result<AnalysisReport, ApiError> {
  let text = resolve_text(input.text, request_id);
  let tier = Tier::resolve(input.difficulty.as_deref());
  debug!(target: "analysis", %request_id, %tier, text = %trunc_for_log(&text, 80), "Text received for analysis");

  let req = AnalysisRequest { text, tier, duration_seconds: None, request_id: request_id.to_string() };
  state.engine.analyze(&req).map_err(|e| ApiError::new(request_id, e))
}

#[instrument(level = "info", skip(state, input), fields(%request_id, mime = %input.mime))]
pub async fn analyze_audio(state: &AppState, request_id: &str, input: AudioAnalysisIn) -> Result<AnalysisReport, ApiError> {
  let fail = |e: AnalysisError| {
    error!(target: "analysis", %request_id, kind = e.kind(), error = %e, "Audio analysis failed");
    ApiError::new(request_id, e)
  };

  let bytes = decode_audio_base64(&input.audio_base64)
    .map_err(|e| fail(AnalysisError::InvalidInput(format!("audioBase64 is not valid base64: {e}"))))?;
  let clip = AudioClip { bytes, mime: input.mime };
  clip.validate().map_err(|e| fail(e.into()))?;

  let transcriber = state
    .transcriber
    .as_deref()
    .ok_or_else(|| fail(TranscriptionError::Unavailable.into()))?;
  let language = input.language.unwrap_or_else(|| state.transcription.language.clone());

  info!(target: "analysis", %request_id, bytes = clip.bytes.len(), %language, "Converting audio to text");
  let transcript = transcribe_with_retry(transcriber, &clip, &language, &state.transcription, request_id)
    .await
    .map_err(|e| fail(e.into()))?;

  // Silence comes back as an empty transcript.
  if transcript.text.trim().is_empty() {
    return Err(fail(TranscriptionError::EmptyAudio.into()));
  }

  let duration = input.duration_seconds.or(transcript.duration_seconds);
  let Some(duration) = duration else {
    return Err(fail(AnalysisError::InvalidDuration(0.0)));
  };

  let req = AnalysisRequest {
    text: transcript.text,
    tier: Tier::resolve(input.difficulty.as_deref()),
    duration_seconds: Some(duration),
    request_id: request_id.to_string(),
  };
  state.engine.analyze(&req).map_err(fail)
}

/// Transcribe with a per-attempt timeout; retry transient failures with a
/// linear backoff, up to `max_attempts` (at least one attempt).
pub async fn transcribe_with_retry(
  transcriber: &dyn Transcriber,
  clip: &AudioClip,
  language: &str,
  cfg: &TranscriptionConfig,
  request_id: &str,
) -> Result<Transcript, TranscriptionError> {
  let attempts = cfg.max_attempts.max(1);
  let mut attempt = 1;
  loop {
    let result = match tokio::time::timeout(
      Duration::from_secs(cfg.timeout_secs),
      transcriber.transcribe(clip, language),
    )
    .await
    {
      Ok(r) => r,
      Err(_) => Err(TranscriptionError::Timeout),
    };

    match result {
      Ok(t) => {
        info!(target: "analysis", %request_id, attempt, text_len = t.text.len(), "Transcription succeeded");
        return Ok(t);
      }
      Err(e) if e.is_retryable() && attempt < attempts => {
        warn!(target: "analysis", %request_id, attempt, kind = e.kind(), error = %e, "Transcription failed; retrying");
        tokio::time::sleep(Duration::from_millis(cfg.backoff_ms.saturating_mul(attempt as u64))).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

#[instrument(level = "info", skip(state, query), fields(%request_id, first_time = ?query.first_time))]
pub async fn next_questions(state: &AppState, request_id: &str, query: QuestionsQuery) -> Result<QuestionsOut, ApiError> {
  let cfg = state.questions_cfg.read().await.clone();

  if query.first_time.unwrap_or(false) {
    let questions = first_time_questions(state.questions.as_ref(), &query.viewed_ids(), &cfg.starting_packs);
    if !questions.is_empty() {
      info!(target: "questions", %request_id, count = questions.len(), "First-time pack served");
      return Ok(QuestionsOut { origin: "starting_pack".into(), questions: localize(&questions, query.lang()) });
    }
    debug!(target: "questions", %request_id, "No unviewed starting pack; using configured strategy");
  }

  let (questions, origin) = select_questions(state.questions.as_ref(), &cfg, &mut rand::thread_rng())
    .map_err(|e| {
      error!(target: "questions", %request_id, error = %e, "Question selection failed");
      ApiError::new(request_id, e)
    })?;
  info!(target: "questions", %request_id, %origin, ids = ?questions.iter().map(|q| q.id).collect::<Vec<_>>(), "Questions served");
  Ok(QuestionsOut { origin: origin.into(), questions: localize(&questions, query.lang()) })
}

fn localize(questions: &[Question], lang: &str) -> Vec<QuestionOut> {
  questions.iter().map(|q| QuestionOut::localized(q, lang)).collect()
}

/// Apply a partial update and return the resulting config.
#[instrument(level = "info", skip(state, input))]
pub async fn update_questions_config(state: &AppState, input: QuestionsConfigIn) -> QuestionsConfig {
  let mut cfg = state.questions_cfg.write().await;
  if let Some(mix) = input.mix {
    cfg.mix = mix;
  }
  if let Some(search) = input.search {
    cfg.search = search;
  }
  if let Some(ids) = input.ids {
    cfg.search = SearchStrategy::Hardcoded { ids };
  }
  info!(target: "questions", mix = ?cfg.mix, search = ?cfg.search, "Question config updated");
  cfg.clone()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
  };

  use async_trait::async_trait;

  use crate::config::AppConfig;
  use crate::domain::QuestionMix;
  use crate::thresholds::Band;

  /// Fails `failures` times with `error`, then returns `transcript`.
  struct FakeTranscriber {
    calls: AtomicU32,
    failures: u32,
    error: fn() -> TranscriptionError,
    transcript: Transcript,
    delay: Option<Duration>,
  }

  impl FakeTranscriber {
    fn ok(text: &str, duration: Option<f64>) -> Self {
      Self {
        calls: AtomicU32::new(0),
        failures: 0,
        error: || TranscriptionError::Timeout,
        transcript: Transcript { text: text.into(), duration_seconds: duration },
        delay: None,
      }
    }
  }

  #[async_trait]
  impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _clip: &AudioClip, _language: &str) -> Result<Transcript, TranscriptionError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      if let Some(d) = self.delay {
        tokio::time::sleep(d).await;
      }
      if n < self.failures {
        Err((self.error)())
      } else {
        Ok(self.transcript.clone())
      }
    }
  }

  fn fast_cfg(max_attempts: u32) -> TranscriptionConfig {
    TranscriptionConfig { language: "en".into(), timeout_secs: 5, max_attempts, backoff_ms: 1 }
  }

  fn state_with(t: Option<Arc<dyn Transcriber>>) -> AppState {
    AppState::from_config(AppConfig { transcription: fast_cfg(3), ..Default::default() }, t)
  }

  fn clip() -> AudioClip {
    AudioClip { bytes: vec![1, 2, 3], mime: "audio/wav".into() }
  }

  fn audio_in(duration: Option<f64>) -> AudioAnalysisIn {
    AudioAnalysisIn {
      audio_base64: "AQID".into(),
      mime: "audio/wav".into(),
      difficulty: None,
      language: None,
      duration_seconds: duration,
    }
  }

  #[test]
  fn blank_or_missing_text_becomes_default_sample() {
    assert_eq!(resolve_text(None, "r"), DEFAULT_TEXT);
    assert_eq!(resolve_text(Some("  \n".into()), "r"), DEFAULT_TEXT);
    assert_eq!(resolve_text(Some("hello".into()), "r"), "hello");
  }

  #[tokio::test]
  async fn unknown_tier_matches_explicit_moderate() {
    let state = state_with(None);
    let text = Some("I looked into it because the results were odd. Then I gave up.".to_string());
    let extreme = analyze_text(&state, "a", TextAnalysisIn { text: text.clone(), difficulty: Some("extreme".into()) })
      .await
      .unwrap();
    let moderate = analyze_text(&state, "b", TextAnalysisIn { text, difficulty: Some("moderate".into()) })
      .await
      .unwrap();
    assert_eq!(extreme, moderate);
    assert_eq!(extreme.difficulty, Tier::Moderate);
  }

  #[tokio::test]
  async fn empty_request_analyses_default_sample() {
    let state = state_with(None);
    let report = analyze_text(&state, "r", TextAnalysisIn::default()).await.unwrap();
    assert_eq!(report.text, DEFAULT_TEXT);
    assert_eq!(report.vocabulary.distinct_words, 22);
    assert_ne!(report.vocabulary.band, Band::InsufficientData);
  }

  #[tokio::test]
  async fn audio_uses_transcript_duration_unless_caller_supplies_one() {
    let words = vec!["talk"; 30].join(" ");
    let fake: Arc<dyn Transcriber> = Arc::new(FakeTranscriber::ok(&words, Some(20.0)));
    let state = state_with(Some(fake));

    let r = analyze_audio(&state, "r", audio_in(None)).await.unwrap();
    assert_eq!(r.duration_seconds, Some(20.0));
    assert_eq!(r.fluency.unwrap().words_per_minute, 90.0);

    let r = analyze_audio(&state, "r", audio_in(Some(60.0))).await.unwrap();
    assert_eq!(r.fluency.unwrap().words_per_minute, 30.0);
  }

  #[tokio::test]
  async fn audio_without_any_duration_is_invalid() {
    let fake: Arc<dyn Transcriber> = Arc::new(FakeTranscriber::ok("hello there", None));
    let state = state_with(Some(fake));
    let err = analyze_audio(&state, "r", audio_in(None)).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_duration");
    assert_eq!(err.request_id, "r");
  }

  #[tokio::test]
  async fn empty_transcript_is_empty_audio_not_a_report() {
    for text in ["", "  \n "] {
      let fake: Arc<dyn Transcriber> = Arc::new(FakeTranscriber::ok(text, Some(5.0)));
      let state = state_with(Some(fake));
      let err = analyze_audio(&state, "r", audio_in(None)).await.unwrap_err();
      assert_eq!(err.kind(), "transcription_empty_audio");
    }
  }

  #[tokio::test]
  async fn audio_without_transcriber_is_a_distinct_failure() {
    let state = state_with(None);
    let err = analyze_audio(&state, "r", audio_in(Some(10.0))).await.unwrap_err();
    assert_eq!(err.kind(), "transcription_unavailable");
  }

  #[tokio::test]
  async fn bad_audio_is_rejected_before_transcription() {
    let fake = Arc::new(FakeTranscriber::ok("x", Some(1.0)));
    let shared: Arc<dyn Transcriber> = fake.clone();
    let state = state_with(Some(shared));

    let mut bad_b64 = audio_in(Some(1.0));
    bad_b64.audio_base64 = "%%%".into();
    assert_eq!(analyze_audio(&state, "r", bad_b64).await.unwrap_err().kind(), "invalid_input");

    let mut empty = audio_in(Some(1.0));
    empty.audio_base64 = String::new();
    assert_eq!(analyze_audio(&state, "r", empty).await.unwrap_err().kind(), "transcription_empty_audio");

    let mut aiff = audio_in(Some(1.0));
    aiff.mime = "audio/aiff".into();
    assert_eq!(analyze_audio(&state, "r", aiff).await.unwrap_err().kind(), "transcription_unsupported_format");

    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn transient_failures_are_retried() {
    let mut fake = FakeTranscriber::ok("done", Some(1.0));
    fake.failures = 2;
    fake.error = || TranscriptionError::Http { status: 503, message: "busy".into() };
    let t = transcribe_with_retry(&fake, &clip(), "en", &fast_cfg(3), "r").await.unwrap();
    assert_eq!(t.text, "done");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn retries_stop_after_max_attempts() {
    let mut fake = FakeTranscriber::ok("never", Some(1.0));
    fake.failures = 10;
    fake.error = || TranscriptionError::Network("reset".into());
    let err = transcribe_with_retry(&fake, &clip(), "en", &fast_cfg(2), "r").await.unwrap_err();
    assert_eq!(err.kind(), "transcription_network");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn permanent_failures_are_not_retried() {
    let mut fake = FakeTranscriber::ok("never", Some(1.0));
    fake.failures = 10;
    fake.error = || TranscriptionError::Http { status: 400, message: "bad file".into() };
    let err = transcribe_with_retry(&fake, &clip(), "en", &fast_cfg(5), "r").await.unwrap_err();
    assert_eq!(err.kind(), "transcription_http");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_transcription_times_out() {
    let mut fake = FakeTranscriber::ok("late", Some(1.0));
    fake.delay = Some(Duration::from_secs(60));
    let cfg = TranscriptionConfig { timeout_secs: 1, max_attempts: 1, ..fast_cfg(1) };
    let err = transcribe_with_retry(&fake, &clip(), "en", &cfg, "r").await.unwrap_err();
    assert!(matches!(err, TranscriptionError::Timeout));
  }

  #[tokio::test]
  async fn questions_follow_config_updates() {
    let state = state_with(None);
    let cfg = update_questions_config(
      &state,
      QuestionsConfigIn { mix: Some(QuestionMix::Normal), search: None, ids: Some(vec![6, 2]) },
    )
    .await;
    assert_eq!(cfg.search, SearchStrategy::Hardcoded { ids: vec![6, 2] });

    let out = next_questions(&state, "r", QuestionsQuery::default()).await.unwrap();
    assert_eq!(out.origin, "normal");
    assert_eq!(out.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![6, 2]);
  }

  #[tokio::test]
  async fn served_questions_carry_translated_words() {
    let state = state_with(None);
    update_questions_config(&state, QuestionsConfigIn { mix: Some(QuestionMix::Normal), search: None, ids: Some(vec![3]) }).await;

    let out = next_questions(&state, "r", QuestionsQuery::default()).await.unwrap();
    assert_eq!(out.questions[0].words[0].translation, "rendirse, dejar de");

    let q = QuestionsQuery { lang: Some("zh-Hans".into()), ..Default::default() };
    let out = next_questions(&state, "r", q).await.unwrap();
    assert_eq!(out.questions[0].words[0].translation, "放弃");
  }

  #[tokio::test]
  async fn first_time_learners_get_a_starting_pack() {
    let state = state_with(None);
    state.questions_cfg.write().await.starting_packs =
      vec![crate::domain::StartingPack { id: 9, question_ids: vec![3, 1] }];

    let q = QuestionsQuery { first_time: Some(true), ..Default::default() };
    let out = next_questions(&state, "r", q).await.unwrap();
    assert_eq!(out.origin, "starting_pack");
    assert_eq!(out.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![3, 1]);

    let q = QuestionsQuery { first_time: Some(true), viewed: Some("9".into()), ..Default::default() };
    let out = next_questions(&state, "r", q).await.unwrap();
    assert_ne!(out.origin, "starting_pack");
  }
}
