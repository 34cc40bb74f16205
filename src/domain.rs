//! Domain models for the question bank: question kinds, the question itself,
//! and the tagged selection strategies.

use serde::{Deserialize, Serialize};

/// What kind of speaking prompt is presented to the learner?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Describe a picture or situation; the warm-up question of a session.
  Describe,
  /// Role-play scenario; served on its own.
  Scenario,
  /// Short comprehension / vocabulary quiz.
  Quiz,
  /// Give and justify an opinion.
  Opinion,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
  pub id: u32,
  pub kind: QuestionKind,
  pub prompt: String,
  #[serde(default)] pub example: String,
  #[serde(default)] pub scenario: Option<String>,
  #[serde(default)] pub image_url: Option<String>,
  /// Recorded reading of the prompt.
  #[serde(default)] pub voice_url: Option<String>,
  /// Target vocabulary the learner should try to use in the answer.
  #[serde(default)] pub words: Vec<VocabularyWord>,
  #[serde(default = "default_active")] pub active: bool,
}

fn default_active() -> bool { true }

/// Language served when the client does not ask for one.
pub const DEFAULT_TRANSLATION_LANG: &str = "es";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Translation {
  pub lang: String,
  pub text: String,
}

/// Text of the translation into `lang`, or "" when there is none. With
/// duplicate entries the last one wins.
pub fn translation_for(items: &[Translation], lang: &str) -> String {
  items
    .iter()
    .rev()
    .find(|t| t.lang == lang)
    .map(|t| t.text.clone())
    .unwrap_or_default()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordExample {
  pub value: String,
  #[serde(default)] pub voice_url: Option<String>,
  #[serde(default)] pub translations: Vec<Translation>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordExplanation {
  pub value: String,
  #[serde(default)] pub image: Option<String>,
  #[serde(default)] pub translations: Vec<Translation>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VocabularyWord {
  pub id: u32,
  pub word: String,
  #[serde(default)] pub definition: String,
  #[serde(default)] pub translations: Vec<Translation>,
  #[serde(default)] pub has_info: bool,
  #[serde(default)] pub examples: Vec<WordExample>,
  #[serde(default)] pub explanations: Vec<WordExplanation>,
  #[serde(default)] pub story: Option<String>,
  #[serde(default)] pub miniature: Option<String>,
  #[serde(default = "default_active")] pub active: bool,
}

/// Which kind of set is served.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionMix {
  /// Scenario set with probability `scenario_probability`, otherwise a normal set.
  Random {
    #[serde(default = "default_scenario_probability")]
    scenario_probability: f64,
  },
  /// Describe + quiz + one more.
  Normal,
  /// A single scenario.
  Scenario,
}

fn default_scenario_probability() -> f64 { 0.35 }

impl Default for QuestionMix {
  fn default() -> Self {
    QuestionMix::Random { scenario_probability: default_scenario_probability() }
  }
}

/// How questions are picked once the mix is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchStrategy {
  #[default]
  Random,
  /// A fixed list of ids (order preserved for normal sets).
  Hardcoded { ids: Vec<u32> },
}

/// Onboarding pack served to first-time learners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartingPack {
  pub id: u32,
  pub question_ids: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct QuestionsConfig {
  #[serde(default)] pub mix: QuestionMix,
  #[serde(default)] pub search: SearchStrategy,
  #[serde(default)] pub starting_packs: Vec<StartingPack>,
}
