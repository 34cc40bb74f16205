//! Text/speech analysis engine.
//!
//! `AnalysisEngine` is built once at start-up (threshold table + lexicon) and
//! shared read-only between requests. For each request it builds a
//! `TextAnalyzer`, which borrows the text and the tier's `ThresholdSet`,
//! tokenises once and exposes the individual metrics. Every metric is a pure
//! function of (text, thresholds, duration).

pub mod lexicon;
pub mod tokens;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::AnalysisError;
use crate::thresholds::{Band, CreativityWeights, ThresholdSet, ThresholdTable, Tier};
use lexicon::Lexicon;

/// Sample analysed when a text request carries no usable text.
pub const DEFAULT_TEXT: &str = "Taking salsa dancing classes is not only a fun way to learn a new skill but also a lively social activity and a great workout.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VocabularyResult {
  pub band: Band,
  /// Type-token ratio; `None` when there are no words.
  pub ratio: Option<f64>,
  pub total_words: usize,
  pub distinct_words: usize,
  /// Share of distinct words outside the common-word list.
  pub rare_word_ratio: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhrasalVerbResult {
  pub band: Band,
  pub count: usize,
  pub matches: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreativityResult {
  pub band: Band,
  /// Composite score in [0, 100].
  pub score: f64,
  pub lexical: f64,
  pub structure: f64,
  pub idiomatic: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LongTalkResult {
  pub band: Band,
  pub is_long: bool,
  pub words: usize,
  pub sentences: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FluencyResult {
  pub band: Band,
  pub words_per_minute: f64,
  pub words: usize,
  pub duration_seconds: f64,
}

/// Aggregate returned to the caller. Speech-only fields are omitted for text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
  pub text: String,
  pub difficulty: Tier,
  pub creativity: CreativityResult,
  pub phrasal_verb: PhrasalVerbResult,
  pub vocabulary: VocabularyResult,
  pub long_talk: LongTalkResult,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_seconds: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fluency: Option<FluencyResult>,
}

/// One unit of work for the engine. Never persisted.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
  pub text: String,
  pub tier: Tier,
  /// Present for speech input only.
  pub duration_seconds: Option<f64>,
  pub request_id: String,
}

pub struct TextAnalyzer<'a> {
  thresholds: &'a ThresholdSet,
  lexicon: &'a Lexicon,
  words: Vec<String>,
  sentences: Vec<Vec<String>>,
}

impl<'a> TextAnalyzer<'a> {
  pub fn new(text: &'a str, thresholds: &'a ThresholdSet, lexicon: &'a Lexicon) -> Self {
    Self {
      thresholds,
      lexicon,
      words: tokens::words(text),
      sentences: tokens::sentences(text),
    }
  }

  pub fn word_count(&self) -> usize {
    self.words.len()
  }

  fn distinct_words(&self) -> usize {
    self.words.iter().collect::<HashSet<_>>().len()
  }

  fn type_token_ratio(&self) -> Option<f64> {
    if self.words.is_empty() {
      None
    } else {
      Some(self.distinct_words() as f64 / self.words.len() as f64)
    }
  }

  pub fn check_vocabulary(&self) -> VocabularyResult {
    let bounds = &self.thresholds.vocabulary;
    let Some(ratio) = self.type_token_ratio() else {
      return VocabularyResult {
        band: Band::InsufficientData,
        ratio: None,
        total_words: 0,
        distinct_words: 0,
        rare_word_ratio: None,
      };
    };

    let distinct: HashSet<&str> = self.words.iter().map(String::as_str).collect();
    let rare = distinct.iter().filter(|w| !self.lexicon.is_common(w)).count();

    VocabularyResult {
      band: Band::classify(ratio, bounds.borderline, bounds.pass),
      ratio: Some(ratio),
      total_words: self.words.len(),
      distinct_words: distinct.len(),
      rare_word_ratio: Some(rare as f64 / distinct.len() as f64),
    }
  }

  /// Verb + particle collocations. The particle may trail the verb by up to
  /// `max_gap` tokens within the same sentence; a token is used at most once.
  pub fn detect_phrasal_verbs(&self) -> PhrasalVerbResult {
    let mut matches = Vec::new();
    for sentence in &self.sentences {
      let mut used = vec![false; sentence.len()];
      for i in 0..sentence.len() {
        if used[i] {
          continue;
        }
        // Prefer the closest particle, then the longest collocation.
        let mut best: Option<(usize, usize, &str, std::ops::Range<usize>)> = None;
        for pv in self.lexicon.phrasal_candidates(&sentence[i]) {
          for gap in 0..=self.lexicon.max_gap {
            let start = i + 1 + gap;
            let end = start + pv.particles.len();
            if end > sentence.len() {
              break;
            }
            let hit = (start..end).all(|k| !used[k] && sentence[k] == pv.particles[k - start]);
            if !hit {
              continue;
            }
            let better = match &best {
              None => true,
              Some((g, len, _, _)) => gap < *g || (gap == *g && pv.particles.len() > *len),
            };
            if better {
              best = Some((gap, pv.particles.len(), pv.phrase.as_str(), start..end));
            }
            break;
          }
        }
        if let Some((_, _, phrase, span)) = best {
          used[i] = true;
          for k in span {
            used[k] = true;
          }
          matches.push(phrase.to_string());
        }
      }
    }

    let bounds = &self.thresholds.phrasal_verbs;
    let band = if self.words.is_empty() {
      Band::InsufficientData
    } else {
      Band::classify(matches.len() as f64, bounds.borderline as f64, bounds.pass as f64)
    };
    PhrasalVerbResult { band, count: matches.len(), matches }
  }

  /// Sentence-length variation plus subordinate-connector density, in [0, 1].
  fn structure_signal(&self) -> f64 {
    if self.sentences.is_empty() {
      return 0.0;
    }
    let lens: Vec<f64> = self.sentences.iter().map(|s| s.len() as f64).collect();
    let n = lens.len() as f64;
    let mean = lens.iter().sum::<f64>() / n;
    let variation = if lens.len() < 2 || mean == 0.0 {
      0.0
    } else {
      let var = lens.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
      (var.sqrt() / mean).min(1.0)
    };

    let connectors = self.words.iter().filter(|w| self.lexicon.is_connector(w)).count();
    let connector_rate = (connectors as f64 / n).min(1.0);

    0.5 * variation + 0.5 * connector_rate
  }

  pub fn check_creativity(&self) -> CreativityResult {
    let Some(lexical) = self.type_token_ratio() else {
      return CreativityResult {
        band: Band::InsufficientData,
        score: 0.0,
        lexical: 0.0,
        structure: 0.0,
        idiomatic: 0.0,
      };
    };

    let structure = self.structure_signal();
    let phrasal_pass = self.thresholds.phrasal_verbs.pass;
    let idiomatic = if phrasal_pass == 0 {
      1.0
    } else {
      (self.detect_phrasal_verbs().count as f64 / phrasal_pass as f64).min(1.0)
    };

    let score = composite(&self.thresholds.creativity_weights, lexical, structure, idiomatic);
    let bounds = &self.thresholds.creativity;
    CreativityResult {
      band: Band::classify(score, bounds.borderline, bounds.pass),
      score,
      lexical,
      structure,
      idiomatic,
    }
  }

  pub fn check_long_talk(&self) -> LongTalkResult {
    let words = self.words.len();
    let sentences = self.sentences.len();
    let b = &self.thresholds.long_talk;
    let band = if words == 0 {
      Band::InsufficientData
    } else if words >= b.pass_words && sentences >= b.min_sentences {
      Band::Pass
    } else if words >= b.borderline_words {
      Band::Borderline
    } else {
      Band::Fail
    };
    LongTalkResult { band, is_long: band == Band::Pass, words, sentences }
  }

  pub fn check_fluency(&self, duration_seconds: f64) -> Result<FluencyResult, AnalysisError> {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
      return Err(AnalysisError::InvalidDuration(duration_seconds));
    }
    let words = self.words.len();
    let words_per_minute = words as f64 * 60.0 / duration_seconds;
    let b = &self.thresholds.fluency;
    let band = if words == 0 {
      Band::InsufficientData
    } else {
      Band::classify(words_per_minute, b.borderline_wpm, b.pass_wpm)
    };
    Ok(FluencyResult { band, words_per_minute, words, duration_seconds })
  }
}

/// Weighted mean of the sub-signals scaled to [0, 100]. Non-negative weights
/// keep the score non-decreasing in every signal.
pub(crate) fn composite(w: &CreativityWeights, lexical: f64, structure: f64, idiomatic: f64) -> f64 {
  let total = w.lexical + w.structure + w.idiomatic;
  if total <= 0.0 {
    return 0.0;
  }
  100.0 * (w.lexical * lexical + w.structure * structure + w.idiomatic * idiomatic) / total
}

pub struct AnalysisEngine {
  thresholds: ThresholdTable,
  lexicon: Lexicon,
}

impl AnalysisEngine {
  pub fn new(thresholds: ThresholdTable, lexicon: Lexicon) -> Self {
    Self { thresholds, lexicon }
  }

  pub fn thresholds(&self) -> &ThresholdTable {
    &self.thresholds
  }

  pub fn lexicon(&self) -> &Lexicon {
    &self.lexicon
  }

  pub fn analyzer<'a>(&'a self, text: &'a str, tier: Tier) -> TextAnalyzer<'a> {
    TextAnalyzer::new(text, self.thresholds.get(tier), &self.lexicon)
  }

  /// Run every metric for one request. A supplied duration must be positive;
  /// that is the only way this fails.
  #[instrument(level = "info", skip(self, req), fields(request_id = %req.request_id, tier = %req.tier, text_len = req.text.len()))]
  pub fn analyze(&self, req: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
    if let Some(d) = req.duration_seconds {
      if !d.is_finite() || d <= 0.0 {
        return Err(AnalysisError::InvalidDuration(d));
      }
    }

    let rid = req.request_id.as_str();
    let analyzer = self.analyzer(&req.text, req.tier);
    debug!(target: "analysis", request_id = %rid, words = analyzer.word_count(), "Text tokenised");

    let creativity = analyzer.check_creativity();
    debug!(target: "analysis", request_id = %rid, score = creativity.score, band = ?creativity.band, "Creativity checked");
    let phrasal_verb = analyzer.detect_phrasal_verbs();
    debug!(target: "analysis", request_id = %rid, count = phrasal_verb.count, "Phrasal verbs detected");
    let vocabulary = analyzer.check_vocabulary();
    debug!(target: "analysis", request_id = %rid, ratio = ?vocabulary.ratio, band = ?vocabulary.band, "Vocabulary checked");
    let long_talk = analyzer.check_long_talk();
    debug!(target: "analysis", request_id = %rid, band = ?long_talk.band, "Long talk checked");
    let fluency = match req.duration_seconds {
      Some(d) => {
        let f = analyzer.check_fluency(d)?;
        debug!(target: "analysis", request_id = %rid, wpm = f.words_per_minute, band = ?f.band, "Fluency checked");
        Some(f)
      }
      None => None,
    };

    info!(target: "analysis", request_id = %rid, tier = %req.tier, speech = fluency.is_some(), "Analysis complete");
    Ok(AnalysisReport {
      text: req.text.clone(),
      difficulty: req.tier,
      creativity,
      phrasal_verb,
      vocabulary,
      long_talk,
      duration_seconds: req.duration_seconds,
      fluency,
    })
  }
}

impl Default for AnalysisEngine {
  fn default() -> Self {
    Self::new(ThresholdTable::default(), Lexicon::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn moderate() -> ThresholdSet {
    ThresholdSet::moderate()
  }

  fn request(text: &str, tier: Tier, duration: Option<f64>) -> AnalysisRequest {
    AnalysisRequest { text: text.into(), tier, duration_seconds: duration, request_id: "test".into() }
  }

  #[test]
  fn vocabulary_on_empty_text_is_insufficient_data() {
    let lx = Lexicon::default();
    let t = moderate();
    for text in ["", "   ", "?!..."] {
      let v = TextAnalyzer::new(text, &t, &lx).check_vocabulary();
      assert_eq!(v.band, Band::InsufficientData);
      assert_eq!(v.ratio, None);
      assert_eq!(v.total_words, 0);
    }
  }

  #[test]
  fn vocabulary_ratio_of_default_text() {
    let lx = Lexicon::default();
    let t = moderate();
    let v = TextAnalyzer::new(DEFAULT_TEXT, &t, &lx).check_vocabulary();
    assert_eq!(v.total_words, 25);
    assert_eq!(v.distinct_words, 22);
    assert!((v.ratio.unwrap() - 0.88).abs() < 1e-9);
    assert_eq!(v.band, Band::Pass);
    let rare = v.rare_word_ratio.unwrap();
    assert!(rare > 0.0 && rare < 1.0);
  }

  #[test]
  fn single_phrasal_verb() {
    let lx = Lexicon::default();
    let t = moderate();
    let p = TextAnalyzer::new("I need to look into this", &t, &lx).detect_phrasal_verbs();
    assert_eq!(p.count, 1);
    assert_eq!(p.matches, vec!["look into"]);
    assert_eq!(p.band, Band::Borderline);
  }

  #[test]
  fn no_phrasal_verbs_is_zero_not_error() {
    let lx = Lexicon::default();
    let t = moderate();
    let p = TextAnalyzer::new("The cat sat quietly.", &t, &lx).detect_phrasal_verbs();
    assert_eq!(p.count, 0);
    assert!(p.matches.is_empty());
    assert_eq!(p.band, Band::Fail);
  }

  #[test]
  fn phrasal_verbs_handle_inflection_gaps_and_longest_match() {
    let lx = Lexicon::default();
    let t = moderate();
    let text = "She GAVE it up last year. We came up with a plan, then ran out of time. Looking forward to it!";
    let p = TextAnalyzer::new(text, &t, &lx).detect_phrasal_verbs();
    assert_eq!(p.matches, vec!["give up", "come up with", "run out of", "look forward to"]);
    assert_eq!(p.band, Band::Pass);
  }

  #[test]
  fn phrasal_verbs_do_not_cross_sentences_or_exceed_gap() {
    let lx = Lexicon::default();
    let t = moderate();
    let a = TextAnalyzer::new("I will give. Up we go", &t, &lx).detect_phrasal_verbs();
    assert_eq!(a.count, 0);
    let b = TextAnalyzer::new("give the old thing up", &t, &lx).detect_phrasal_verbs();
    assert_eq!(b.count, 0);
  }

  #[test]
  fn creativity_composite_is_monotonic() {
    let w = CreativityWeights::default();
    let steps = [0.0, 0.25, 0.5, 0.75, 1.0];
    for &a in &steps {
      for &b in &steps {
        for win in steps.windows(2) {
          assert!(composite(&w, win[0], a, b) <= composite(&w, win[1], a, b));
          assert!(composite(&w, a, win[0], b) <= composite(&w, a, win[1], b));
          assert!(composite(&w, a, b, win[0]) <= composite(&w, a, b, win[1]));
        }
      }
    }
  }

  #[test]
  fn more_distinct_vocabulary_never_lowers_creativity() {
    let lx = Lexicon::default();
    let t = moderate();
    let repetitive = TextAnalyzer::new("the dog saw the dog and the dog ran", &t, &lx).check_creativity();
    let varied = TextAnalyzer::new("the dog saw a cat and one bird flew", &t, &lx).check_creativity();
    assert!(varied.lexical > repetitive.lexical);
    assert!(varied.score >= repetitive.score);
  }

  #[test]
  fn creativity_of_default_text() {
    let lx = Lexicon::default();
    let t = moderate();
    let c = TextAnalyzer::new(DEFAULT_TEXT, &t, &lx).check_creativity();
    assert_eq!(c.structure, 0.0);
    assert_eq!(c.idiomatic, 0.0);
    assert!((c.score - 44.0).abs() < 1e-9);
    assert_eq!(c.band, Band::Borderline);
  }

  #[test]
  fn connectors_and_varied_sentences_raise_structure() {
    let lx = Lexicon::default();
    let t = moderate();
    let flat = TextAnalyzer::new("I ran. I ate. I slept.", &t, &lx).check_creativity();
    let varied = TextAnalyzer::new(
      "I ran. Although it was raining heavily outside, I ate because I was hungry. I slept.",
      &t,
      &lx,
    )
    .check_creativity();
    assert_eq!(flat.structure, 0.0);
    assert!(varied.structure > 0.0);
  }

  #[test]
  fn long_talk_bands() {
    let lx = Lexicon::default();
    let t = moderate();
    let short = TextAnalyzer::new("Yes.", &t, &lx).check_long_talk();
    assert_eq!(short.band, Band::Fail);
    assert!(!short.is_long);

    let one_sentence = TextAnalyzer::new(DEFAULT_TEXT, &t, &lx).check_long_talk();
    assert_eq!(one_sentence.band, Band::Borderline);

    let long = format!("{DEFAULT_TEXT} {DEFAULT_TEXT}");
    let two = TextAnalyzer::new(&long, &t, &lx).check_long_talk();
    assert_eq!((two.words, two.sentences), (50, 2));
    assert_eq!(two.band, Band::Pass);
    assert!(two.is_long);

    assert_eq!(TextAnalyzer::new("", &t, &lx).check_long_talk().band, Band::InsufficientData);
  }

  #[test]
  fn decimals_do_not_count_as_extra_sentences() {
    let lx = Lexicon::default();
    let t = moderate();
    let text = format!(
      "{} and I paid 3.50 dollars for the first lesson with my best friends from work last week.",
      DEFAULT_TEXT.trim_end_matches('.')
    );
    let lt = TextAnalyzer::new(&text, &t, &lx).check_long_talk();
    assert_eq!((lt.words, lt.sentences), (42, 1));
    assert_eq!(lt.band, Band::Borderline);
    assert!(!lt.is_long);
  }

  #[test]
  fn fluency_rejects_non_positive_duration() {
    let lx = Lexicon::default();
    let t = moderate();
    let a = TextAnalyzer::new("hello there", &t, &lx);
    for d in [0.0, -3.0, f64::NAN, f64::INFINITY] {
      assert!(matches!(a.check_fluency(d), Err(AnalysisError::InvalidDuration(_))));
    }
  }

  #[test]
  fn fluency_words_per_minute() {
    let lx = Lexicon::default();
    let t = moderate();
    let text = vec!["word"; 150].join(" ");
    let f = TextAnalyzer::new(&text, &t, &lx).check_fluency(60.0).unwrap();
    assert_eq!(f.words_per_minute, 150.0);
    assert_eq!(f.band, Band::Pass);

    let slow = TextAnalyzer::new(&text, &t, &lx).check_fluency(180.0).unwrap();
    assert_eq!(slow.words_per_minute, 50.0);
    assert_eq!(slow.band, Band::Fail);
  }

  #[test]
  fn repeated_analysis_is_byte_identical() {
    let engine = AnalysisEngine::default();
    let req = request(
      "We set up the stall early. Although it rained, people showed up and we sold out!",
      Tier::Hard,
      Some(12.5),
    );
    let a = serde_json::to_string(&engine.analyze(&req).unwrap()).unwrap();
    let b = serde_json::to_string(&engine.analyze(&req).unwrap()).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn default_text_end_to_end() {
    let engine = AnalysisEngine::default();
    let report = engine.analyze(&request(DEFAULT_TEXT, Tier::Moderate, None)).unwrap();
    assert_eq!(report.text, DEFAULT_TEXT);
    assert_eq!(report.vocabulary.total_words, 25);
    assert_eq!(report.vocabulary.distinct_words, 22);
    assert_ne!(report.creativity.band, Band::InsufficientData);
    assert_ne!(report.long_talk.band, Band::InsufficientData);
    assert_eq!(report.phrasal_verb.count, 0);
    assert!(report.fluency.is_none());

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("fluency").is_none());
    assert!(json.get("duration_seconds").is_none());
    assert_eq!(json["vocabulary"]["band"], "pass");
  }

  #[test]
  fn speech_report_includes_fluency() {
    let engine = AnalysisEngine::default();
    let report = engine.analyze(&request(DEFAULT_TEXT, Tier::Easy, Some(10.0))).unwrap();
    let f = report.fluency.unwrap();
    assert_eq!(f.words_per_minute, 150.0);
    assert_eq!(report.duration_seconds, Some(10.0));
  }

  #[test]
  fn invalid_duration_aborts_the_report() {
    let engine = AnalysisEngine::default();
    let err = engine.analyze(&request(DEFAULT_TEXT, Tier::Easy, Some(0.0))).unwrap_err();
    assert_eq!(err.kind(), "invalid_duration");
  }

  #[test]
  fn stricter_tier_never_gives_a_better_band() {
    let engine = AnalysisEngine::default();
    let easy = engine.analyze(&request(DEFAULT_TEXT, Tier::Easy, Some(15.0))).unwrap();
    let hard = engine.analyze(&request(DEFAULT_TEXT, Tier::Hard, Some(15.0))).unwrap();
    assert!(hard.vocabulary.band <= easy.vocabulary.band);
    assert!(hard.creativity.band <= easy.creativity.band);
    assert!(hard.long_talk.band <= easy.long_talk.band);
    assert!(hard.fluency.unwrap().band <= easy.fluency.unwrap().band);
  }
}
