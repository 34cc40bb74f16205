//! Difficulty tiers and their band boundaries.
//!
//! A `ThresholdTable` holds one `ThresholdSet` per tier. Bounds must be
//! monotonic across tiers (easy ≤ moderate ≤ hard) and ordered within a tier
//! (borderline ≤ pass); `validate` enforces both.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnalysisError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Easy,
  Moderate,
  Hard,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Moderate, Tier::Hard];

  pub fn as_str(self) -> &'static str {
    match self {
      Tier::Easy => "easy",
      Tier::Moderate => "moderate",
      Tier::Hard => "hard",
    }
  }

  /// Adapter-side resolution: a missing or unrecognised tier falls back to `moderate`.
  pub fn resolve(name: Option<&str>) -> Tier {
    match name {
      None => Tier::default(),
      Some(n) => n.parse().unwrap_or_else(|e: AnalysisError| {
        warn!(target: "analysis", kind = e.kind(), requested = %n, fallback = "moderate", "Unknown difficulty tier");
        Tier::default()
      }),
    }
  }
}

impl Default for Tier {
  fn default() -> Self { Tier::Moderate }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Tier {
  type Err = AnalysisError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Tier::Easy),
      "moderate" => Ok(Tier::Moderate),
      "hard" => Ok(Tier::Hard),
      _ => Err(AnalysisError::UnknownTier(s.to_string())),
    }
  }
}

/// Qualitative classification of a raw metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
  InsufficientData,
  Fail,
  Borderline,
  Pass,
}

impl Band {
  pub fn classify(value: f64, borderline: f64, pass: f64) -> Band {
    if value >= pass {
      Band::Pass
    } else if value >= borderline {
      Band::Borderline
    } else {
      Band::Fail
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioBounds {
  pub borderline: f64,
  pub pass: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountBounds {
  pub borderline: usize,
  pub pass: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LongTalkBounds {
  pub borderline_words: usize,
  pub pass_words: usize,
  pub min_sentences: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluencyBounds {
  pub borderline_wpm: f64,
  pub pass_wpm: f64,
}

/// Relative weight of each creativity sub-signal. Only the ratios matter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreativityWeights {
  pub lexical: f64,
  pub structure: f64,
  pub idiomatic: f64,
}

impl Default for CreativityWeights {
  fn default() -> Self {
    Self { lexical: 0.5, structure: 0.3, idiomatic: 0.2 }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
  pub vocabulary: RatioBounds,
  pub phrasal_verbs: CountBounds,
  pub creativity: RatioBounds,
  pub long_talk: LongTalkBounds,
  pub fluency: FluencyBounds,
  #[serde(default)]
  pub creativity_weights: CreativityWeights,
}

impl ThresholdSet {
  pub fn easy() -> Self {
    Self {
      vocabulary: RatioBounds { borderline: 0.40, pass: 0.55 },
      phrasal_verbs: CountBounds { borderline: 1, pass: 1 },
      creativity: RatioBounds { borderline: 25.0, pass: 40.0 },
      long_talk: LongTalkBounds { borderline_words: 10, pass_words: 20, min_sentences: 1 },
      fluency: FluencyBounds { borderline_wpm: 70.0, pass_wpm: 90.0 },
      creativity_weights: CreativityWeights::default(),
    }
  }

  pub fn moderate() -> Self {
    Self {
      vocabulary: RatioBounds { borderline: 0.50, pass: 0.65 },
      phrasal_verbs: CountBounds { borderline: 1, pass: 2 },
      creativity: RatioBounds { borderline: 35.0, pass: 50.0 },
      long_talk: LongTalkBounds { borderline_words: 20, pass_words: 40, min_sentences: 2 },
      fluency: FluencyBounds { borderline_wpm: 90.0, pass_wpm: 110.0 },
      creativity_weights: CreativityWeights::default(),
    }
  }

  pub fn hard() -> Self {
    Self {
      vocabulary: RatioBounds { borderline: 0.60, pass: 0.75 },
      phrasal_verbs: CountBounds { borderline: 2, pass: 3 },
      creativity: RatioBounds { borderline: 45.0, pass: 60.0 },
      long_talk: LongTalkBounds { borderline_words: 35, pass_words: 70, min_sentences: 3 },
      fluency: FluencyBounds { borderline_wpm: 110.0, pass_wpm: 130.0 },
      creativity_weights: CreativityWeights::default(),
    }
  }

  /// Every bound of this set, by name. Weights are not bounds and are left out.
  pub fn bounds(&self) -> [(&'static str, f64); 11] {
    [
      ("vocabulary.borderline", self.vocabulary.borderline),
      ("vocabulary.pass", self.vocabulary.pass),
      ("phrasal_verbs.borderline", self.phrasal_verbs.borderline as f64),
      ("phrasal_verbs.pass", self.phrasal_verbs.pass as f64),
      ("creativity.borderline", self.creativity.borderline),
      ("creativity.pass", self.creativity.pass),
      ("long_talk.borderline_words", self.long_talk.borderline_words as f64),
      ("long_talk.pass_words", self.long_talk.pass_words as f64),
      ("long_talk.min_sentences", self.long_talk.min_sentences as f64),
      ("fluency.borderline_wpm", self.fluency.borderline_wpm),
      ("fluency.pass_wpm", self.fluency.pass_wpm),
    ]
  }

  fn validate_within(&self, tier: Tier) -> Result<(), AnalysisError> {
    let pairs = [
      ("vocabulary", self.vocabulary.borderline, self.vocabulary.pass),
      ("phrasal_verbs", self.phrasal_verbs.borderline as f64, self.phrasal_verbs.pass as f64),
      ("creativity", self.creativity.borderline, self.creativity.pass),
      ("long_talk", self.long_talk.borderline_words as f64, self.long_talk.pass_words as f64),
      ("fluency", self.fluency.borderline_wpm, self.fluency.pass_wpm),
    ];
    for (name, borderline, pass) in pairs {
      if !borderline.is_finite() || !pass.is_finite() || borderline > pass {
        return Err(AnalysisError::Config(format!(
          "{tier}: {name} borderline ({borderline}) must be finite and <= pass ({pass})"
        )));
      }
    }

    let w = &self.creativity_weights;
    let weights = [w.lexical, w.structure, w.idiomatic];
    if weights.iter().any(|x| !x.is_finite() || *x < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
      return Err(AnalysisError::Config(format!(
        "{tier}: creativity weights must be non-negative and not all zero"
      )));
    }
    Ok(())
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
  pub easy: ThresholdSet,
  pub moderate: ThresholdSet,
  pub hard: ThresholdSet,
}

impl Default for ThresholdTable {
  fn default() -> Self {
    Self { easy: ThresholdSet::easy(), moderate: ThresholdSet::moderate(), hard: ThresholdSet::hard() }
  }
}

impl ThresholdTable {
  pub fn get(&self, tier: Tier) -> &ThresholdSet {
    match tier {
      Tier::Easy => &self.easy,
      Tier::Moderate => &self.moderate,
      Tier::Hard => &self.hard,
    }
  }

  pub fn lookup(&self, name: &str) -> Result<&ThresholdSet, AnalysisError> {
    Ok(self.get(name.parse()?))
  }

  pub fn iter(&self) -> impl Iterator<Item = (Tier, &ThresholdSet)> {
    Tier::ALL.into_iter().map(move |t| (t, self.get(t)))
  }

  /// Check ordering within each tier and monotonicity across tiers.
  pub fn validate(&self) -> Result<(), AnalysisError> {
    for (tier, set) in self.iter() {
      set.validate_within(tier)?;
    }

    let sets = [&self.easy, &self.moderate, &self.hard];
    for pair in sets.windows(2) {
      for ((name, lo), (_, hi)) in pair[0].bounds().into_iter().zip(pair[1].bounds()) {
        if lo > hi {
          return Err(AnalysisError::Config(format!(
            "{name} is not monotonic across tiers ({lo} > {hi})"
          )));
        }
      }
    }
    Ok(())
  }
}
