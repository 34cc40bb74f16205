//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::analyzer::AnalysisReport;
use crate::domain::{
    translation_for, Question, QuestionKind, QuestionMix, QuestionsConfig, SearchStrategy, VocabularyWord,
    DEFAULT_TRANSLATION_LANG,
};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    AnalyzeText(TextAnalysisIn),
    AnalyzeAudio(AudioAnalysisIn),
    Questions(QuestionsQuery),
    UpdateQuestionsConfig(QuestionsConfigIn),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Analysis {
        #[serde(rename = "requestId")]
        request_id: String,
        report: AnalysisReport,
    },
    Questions(QuestionsOut),
    QuestionsConfig(QuestionsConfig),
    Error(ErrorOut),
}

//
// HTTP request/response DTOs
//

/// Typed text to analyse. Both fields are optional: the adapter substitutes
/// the default sample and the default tier.
#[derive(Debug, Default, Deserialize)]
pub struct TextAnalysisIn {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioAnalysisIn {
    #[serde(rename = "audioBase64")]
    pub audio_base64: String,
    pub mime: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Transcription language; defaults to the configured one.
    #[serde(default)]
    pub language: Option<String>,
    /// Caller-measured clip length; overrides what the transcriber reports.
    #[serde(default, rename = "durationSeconds")]
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionsQuery {
    #[serde(default, rename = "firstTime")]
    pub first_time: Option<bool>,
    /// Comma-separated ids of starting packs already seen.
    #[serde(default)]
    pub viewed: Option<String>,
    /// Language of the vocabulary translations (default "es").
    #[serde(default)]
    pub lang: Option<String>,
}

impl QuestionsQuery {
    /// Parsed `viewed` list; malformed entries are ignored.
    pub fn viewed_ids(&self) -> Vec<u32> {
        self.viewed
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }

    pub fn lang(&self) -> &str {
        self.lang
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_TRANSLATION_LANG)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionsOut {
    pub origin: String,
    pub questions: Vec<QuestionOut>,
}

/// A question as served to the client, with translations resolved for one
/// language and inactive words left out.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionOut {
    pub id: u32,
    pub kind: QuestionKind,
    pub prompt: String,
    pub example: String,
    pub scenario: Option<String>,
    pub image_url: Option<String>,
    pub voice_url: Option<String>,
    pub words: Vec<WordOut>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WordOut {
    pub id: u32,
    pub word: String,
    pub definition: String,
    pub translation: String,
    pub has_info: bool,
    pub examples: Vec<ExampleOut>,
    pub explanations: Vec<ExplanationOut>,
    pub story: Option<String>,
    pub miniature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExampleOut {
    pub value: String,
    pub voice_url: Option<String>,
    pub translation: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExplanationOut {
    pub value: String,
    pub image: Option<String>,
    pub translation: String,
}

impl QuestionOut {
    pub fn localized(q: &Question, lang: &str) -> Self {
        Self {
            id: q.id,
            kind: q.kind,
            prompt: q.prompt.clone(),
            example: q.example.clone(),
            scenario: q.scenario.clone(),
            image_url: q.image_url.clone(),
            voice_url: q.voice_url.clone(),
            words: q.words.iter().filter(|w| w.active).map(|w| WordOut::localized(w, lang)).collect(),
        }
    }
}

impl WordOut {
    fn localized(w: &VocabularyWord, lang: &str) -> Self {
        Self {
            id: w.id,
            word: w.word.clone(),
            definition: w.definition.clone(),
            translation: translation_for(&w.translations, lang),
            has_info: w.has_info,
            examples: w
                .examples
                .iter()
                .map(|ex| ExampleOut {
                    value: ex.value.clone(),
                    voice_url: ex.voice_url.clone(),
                    translation: translation_for(&ex.translations, lang),
                })
                .collect(),
            explanations: w
                .explanations
                .iter()
                .map(|ex| ExplanationOut {
                    value: ex.value.clone(),
                    image: ex.image.clone(),
                    translation: translation_for(&ex.translations, lang),
                })
                .collect(),
            story: w.story.clone(),
            miniature: w.miniature.clone(),
        }
    }
}

/// Partial update of the question selection config.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionsConfigIn {
    #[serde(default)]
    pub mix: Option<QuestionMix>,
    #[serde(default)]
    pub search: Option<SearchStrategy>,
    /// Shorthand for `search = hardcoded { ids }`.
    #[serde(default)]
    pub ids: Option<Vec<u32>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorOut {
    pub kind: String,
    pub message: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_messages_parse_with_type_tag() {
        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"analyze_text","text":"hi","difficulty":"hard"}"#).unwrap();
        match m {
            ClientWsMessage::AnalyzeText(t) => {
                assert_eq!(t.text.as_deref(), Some("hi"));
                assert_eq!(t.difficulty.as_deref(), Some("hard"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let m: ClientWsMessage = serde_json::from_str(
            r#"{"type":"analyze_audio","audioBase64":"AAA=","mime":"audio/wav","durationSeconds":3.5}"#,
        )
        .unwrap();
        assert!(matches!(m, ClientWsMessage::AnalyzeAudio(a) if a.duration_seconds == Some(3.5)));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"analyze_text"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::AnalyzeText(TextAnalysisIn { text: None, .. })));
    }

    #[test]
    fn questions_are_localized_with_spanish_by_default() {
        let q = crate::seeds::seed_questions().into_iter().find(|q| q.id == 3).unwrap();

        let query = QuestionsQuery::default();
        assert_eq!(query.lang(), "es");
        let es = QuestionOut::localized(&q, query.lang());
        assert_eq!(es.words[0].word, "give up");
        assert_eq!(es.words[0].translation, "rendirse, dejar de");
        assert!(es.words[0].examples[0].translation.starts_with("Ella nunca"));

        let pt = QuestionOut::localized(&q, "pt");
        assert_eq!(pt.words[0].translation, "desistir");
        assert_eq!(pt.words[0].examples[0].translation, "");
    }

    #[test]
    fn inactive_words_are_not_served() {
        let mut q = crate::seeds::seed_questions().into_iter().find(|q| q.id == 4).unwrap();
        q.words[0].active = false;
        let out = QuestionOut::localized(&q, "es");
        assert_eq!(out.words.len(), 1);
        assert_eq!(out.words[0].word, "look after");
    }

    #[test]
    fn viewed_ids_skip_garbage() {
        let q = QuestionsQuery { first_time: Some(true), viewed: Some("1, 2,x,,3".into()), lang: None };
        assert_eq!(q.viewed_ids(), vec![1, 2, 3]);
        assert!(QuestionsQuery::default().viewed_ids().is_empty());
    }
}
