//! Loading service configuration (thresholds, lexicon, transcription policy,
//! question bank) from TOML.
//!
//! See `AppConfig` for the expected schema. Every section is optional; a
//! missing or broken file means built-in defaults.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::analyzer::lexicon::LexiconConfig;
use crate::domain::{Question, QuestionsConfig};
use crate::error::AnalysisError;
use crate::thresholds::ThresholdTable;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub thresholds: Option<ThresholdTable>,
  #[serde(default)]
  pub lexicon: LexiconConfig,
  #[serde(default)]
  pub transcription: TranscriptionConfig,
  #[serde(default)]
  pub questions: QuestionsConfig,
  /// Extra questions on top of the built-in seeds.
  #[serde(default)]
  pub question_bank: Vec<Question>,
}

/// Retry/timeout policy for the speech-to-text call. Owned by the request
/// adapter, not by the transcription client.
#[derive(Clone, Debug, Deserialize)]
pub struct TranscriptionConfig {
  #[serde(default = "default_language")]
  pub language: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_backoff_ms")]
  pub backoff_ms: u64,
}

fn default_language() -> String { "en".into() }
fn default_timeout_secs() -> u64 { 30 }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 500 }

impl Default for TranscriptionConfig {
  fn default() -> Self {
    Self {
      language: default_language(),
      timeout_secs: default_timeout_secs(),
      max_attempts: default_max_attempts(),
      backoff_ms: default_backoff_ms(),
    }
  }
}

impl TranscriptionConfig {
  pub const MAX_TIMEOUT_SECS: u64 = 600;
  pub const MAX_ATTEMPTS: u32 = 10;
  pub const MAX_BACKOFF_MS: u64 = 60_000;

  pub fn validate(&self) -> Result<(), AnalysisError> {
    if self.language.trim().is_empty() {
      return Err(AnalysisError::Config("transcription.language must not be empty".into()));
    }
    if !(1..=Self::MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
      return Err(AnalysisError::Config(format!(
        "transcription.timeout_secs must be within 1..={} (got {})",
        Self::MAX_TIMEOUT_SECS, self.timeout_secs
      )));
    }
    if !(1..=Self::MAX_ATTEMPTS).contains(&self.max_attempts) {
      return Err(AnalysisError::Config(format!(
        "transcription.max_attempts must be within 1..={} (got {})",
        Self::MAX_ATTEMPTS, self.max_attempts
      )));
    }
    if self.backoff_ms > Self::MAX_BACKOFF_MS {
      return Err(AnalysisError::Config(format!(
        "transcription.backoff_ms must be at most {} (got {})",
        Self::MAX_BACKOFF_MS, self.backoff_ms
      )));
    }
    Ok(())
  }
}

impl AppConfig {
  /// Configured transcription policy if it validates, otherwise the defaults.
  pub fn transcription_or_default(&self) -> TranscriptionConfig {
    match self.transcription.validate() {
      Ok(()) => self.transcription.clone(),
      Err(e) => {
        error!(target: "speakup_backend", error = %e, "Configured transcription policy rejected; using defaults");
        TranscriptionConfig::default()
      }
    }
  }

  /// Configured thresholds if they validate, otherwise the built-in table.
  pub fn thresholds_or_default(&self) -> ThresholdTable {
    match &self.thresholds {
      None => ThresholdTable::default(),
      Some(t) => match t.validate() {
        Ok(()) => {
          info!(target: "speakup_backend", "Using configured threshold table");
          t.clone()
        }
        Err(e) => {
          error!(target: "speakup_backend", error = %e, "Configured thresholds rejected; using defaults");
          ThresholdTable::default()
        }
      },
    }
  }
}

pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from ANALYZER_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let Ok(path) = std::env::var("ANALYZER_CONFIG_PATH") else {
    warn!(target: "speakup_backend", "ANALYZER_CONFIG_PATH not set; using built-in defaults");
    return None;
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "speakup_backend", %path, "Loaded analyzer config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "speakup_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "speakup_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
