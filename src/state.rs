//! Application state: the analysis engine, the speech-to-text client, the
//! question bank and its selection config.
//!
//! Everything here is constructed once at start-up and injected into the
//! handlers; only the question config is mutable at runtime.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::analyzer::{lexicon::Lexicon, AnalysisEngine};
use crate::config::{load_app_config_from_env, AppConfig, TranscriptionConfig};
use crate::domain::{QuestionKind, QuestionsConfig};
use crate::openai::{OpenAiTranscriber, Transcriber};
use crate::questions::{InMemoryQuestionRepository, QuestionRepository};
use crate::seeds::seed_questions;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub transcription: TranscriptionConfig,
    pub questions: Arc<dyn QuestionRepository>,
    pub questions_cfg: Arc<RwLock<QuestionsConfig>>,
}

impl AppState {
    /// Build state from env: load config, seed questions, init the transcriber.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let transcriber = OpenAiTranscriber::from_env();
        if let Some(t) = &transcriber {
            info!(target: "speakup_backend", base_url = %t.base_url, transcribe_model = %t.transcribe_model, "Speech-to-text enabled.");
        } else {
            info!(target: "speakup_backend", "Speech-to-text disabled (no OPENAI_API_KEY). Audio analysis will fail.");
        }

        Self::from_config(cfg, transcriber.map(|t| Arc::new(t) as Arc<dyn Transcriber>))
    }

    /// Build state from an already-loaded config and an optional transcriber.
    pub fn from_config(cfg: AppConfig, transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        let transcription = cfg.transcription_or_default();
        let engine = AnalysisEngine::new(cfg.thresholds_or_default(), Lexicon::from_config(&cfg.lexicon));
        for (tier, set) in engine.thresholds().iter() {
            info!(target: "analysis", %tier, vocabulary = ?set.vocabulary, fluency = ?set.fluency, "Threshold set loaded");
        }
        info!(target: "analysis", phrasal_verbs = engine.lexicon().phrasal_len(), max_gap = engine.lexicon().max_gap, "Lexicon loaded");

        // Config-bank questions win over built-in seeds with the same id.
        let repo = InMemoryQuestionRepository::new(cfg.question_bank.into_iter().chain(seed_questions()));
        for kind in [QuestionKind::Describe, QuestionKind::Quiz, QuestionKind::Opinion, QuestionKind::Scenario] {
            info!(target: "questions", ?kind, active = repo.find_active(Some(kind)).len(), "Startup question inventory");
        }

        Self {
            engine: Arc::new(engine),
            transcriber,
            transcription,
            questions: Arc::new(repo),
            questions_cfg: Arc::new(RwLock::new(cfg.questions)),
        }
    }
}
