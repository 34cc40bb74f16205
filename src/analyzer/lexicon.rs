//! Reference word lists used by the metrics: phrasal verbs, clause connectors
//! and a common-word frequency list.
//!
//! The phrasal-verb and connector lists can be replaced from the TOML config;
//! the frequency list is built in.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_PHRASAL_VERBS: &[&str] = &[
  "back up", "blow up", "break down", "break up", "bring up", "calm down",
  "carry on", "catch up", "check out", "cheer up", "clean up", "come across",
  "come back", "come up with", "cut down", "deal with", "drop off", "eat out",
  "end up", "fall apart", "figure out", "fill out", "find out", "get along",
  "get back", "get over", "get up", "give up", "go on", "go out", "go over",
  "grow up", "hang out", "hold on", "keep on", "keep up", "look after",
  "look for", "look forward to", "look into", "look up", "make up", "pick up",
  "point out", "put off", "put on", "run into", "run out of", "set off",
  "set up", "show up", "sign up", "sit down", "slow down", "speak up",
  "stand up", "take off", "take over", "take up", "think over", "throw away",
  "try out", "turn down", "turn off", "turn on", "turn up", "wake up",
  "warm up", "work out", "write down",
];

pub const DEFAULT_CONNECTORS: &[&str] = &[
  "after", "although", "because", "before", "however", "if", "meanwhile",
  "moreover", "nevertheless", "once", "otherwise", "since", "therefore",
  "though", "unless", "until", "when", "whenever", "where", "whereas",
  "wherever", "whether", "which", "while", "who", "whom", "whose",
  "furthermore", "consequently",
];

/// Roughly the most frequent English words; anything outside counts as "rare".
const COMMON_WORDS: &[&str] = &[
  "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at",
  "back", "be", "because", "been", "but", "by", "can", "come", "could", "day",
  "did", "do", "does", "don't", "even", "first", "for", "from", "get", "give",
  "go", "good", "had", "has", "have", "he", "her", "him", "his", "how", "i",
  "i'm", "if", "in", "into", "is", "it", "it's", "its", "just", "know", "like",
  "look", "make", "me", "more", "most", "my", "new", "no", "not", "now", "of",
  "on", "one", "only", "or", "other", "our", "out", "over", "people", "say",
  "see", "she", "so", "some", "take", "than", "that", "the", "their", "them",
  "then", "there", "these", "they", "thing", "think", "this", "time", "to",
  "two", "up", "us", "use", "very", "want", "was", "way", "we", "well", "went",
  "were", "what", "when", "which", "who", "will", "with", "work", "would",
  "year", "you", "your", "really", "much", "many", "lot", "got", "going",
  "need", "here", "where", "why", "should", "because", "great", "fun", "learn",
  "love", "big", "little", "home", "school", "friend", "friends", "family",
];

/// Irregular past/participle forms for verbs that show up in phrasal verbs.
const IRREGULAR_FORMS: &[(&str, &[&str])] = &[
  ("blow", &["blew", "blown"]),
  ("break", &["broke", "broken"]),
  ("bring", &["brought"]),
  ("catch", &["caught"]),
  ("come", &["came"]),
  ("deal", &["dealt"]),
  ("eat", &["ate", "eaten"]),
  ("fall", &["fell", "fallen"]),
  ("find", &["found"]),
  ("get", &["got", "gotten"]),
  ("give", &["gave", "given"]),
  ("go", &["went", "gone"]),
  ("grow", &["grew", "grown"]),
  ("hang", &["hung"]),
  ("hold", &["held"]),
  ("keep", &["kept"]),
  ("make", &["made"]),
  ("run", &["ran"]),
  ("sit", &["sat"]),
  ("speak", &["spoke", "spoken"]),
  ("stand", &["stood"]),
  ("take", &["took", "taken"]),
  ("think", &["thought"]),
  ("throw", &["threw", "thrown"]),
  ("wake", &["woke", "woken"]),
  ("write", &["wrote", "written"]),
];

/// Optional overrides from the `[lexicon]` TOML table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LexiconConfig {
  #[serde(default)]
  pub phrasal_verbs: Option<Vec<String>>,
  #[serde(default)]
  pub connectors: Option<Vec<String>>,
  /// Tokens allowed between a verb and its particle ("give it up" needs 1).
  #[serde(default)]
  pub max_gap: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhrasalVerb {
  /// Canonical form reported in results, e.g. "look into".
  pub phrase: String,
  pub particles: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Lexicon {
  phrasal: Vec<PhrasalVerb>,
  /// Inflected verb form -> indexes into `phrasal`.
  verb_forms: HashMap<String, Vec<usize>>,
  connectors: HashSet<String>,
  common: HashSet<&'static str>,
  pub max_gap: usize,
}

impl Default for Lexicon {
  fn default() -> Self {
    Self::from_config(&LexiconConfig::default())
  }
}

impl Lexicon {
  pub const DEFAULT_MAX_GAP: usize = 1;

  pub fn from_config(cfg: &LexiconConfig) -> Self {
    let phrasal_src: Vec<String> = cfg
      .phrasal_verbs
      .clone()
      .unwrap_or_else(|| DEFAULT_PHRASAL_VERBS.iter().map(|s| s.to_string()).collect());
    let connectors_src: Vec<String> = cfg
      .connectors
      .clone()
      .unwrap_or_else(|| DEFAULT_CONNECTORS.iter().map(|s| s.to_string()).collect());

    let mut phrasal = Vec::new();
    let mut verb_forms: HashMap<String, Vec<usize>> = HashMap::new();
    for entry in &phrasal_src {
      let parts: Vec<String> = super::tokens::words(entry);
      if parts.len() < 2 {
        warn!(target: "analysis", %entry, "Ignoring phrasal verb without a particle");
        continue;
      }
      let idx = phrasal.len();
      for form in inflections(&parts[0]) {
        verb_forms.entry(form).or_default().push(idx);
      }
      phrasal.push(PhrasalVerb { phrase: parts.join(" "), particles: parts[1..].to_vec() });
    }

    Self {
      phrasal,
      verb_forms,
      connectors: connectors_src.iter().map(|c| c.trim().to_lowercase()).collect(),
      common: COMMON_WORDS.iter().copied().collect(),
      max_gap: cfg.max_gap.unwrap_or(Self::DEFAULT_MAX_GAP),
    }
  }

  /// Phrasal verbs whose verb can take the form `token`.
  pub fn phrasal_candidates(&self, token: &str) -> impl Iterator<Item = &PhrasalVerb> {
    self
      .verb_forms
      .get(token)
      .into_iter()
      .flatten()
      .map(move |&i| &self.phrasal[i])
  }

  pub fn is_connector(&self, token: &str) -> bool {
    self.connectors.contains(token)
  }

  pub fn is_common(&self, token: &str) -> bool {
    self.common.contains(token)
  }

  pub fn phrasal_len(&self) -> usize {
    self.phrasal.len()
  }
}

/// Surface forms of a verb: base, third person, past, gerund, plus irregulars.
pub fn inflections(lemma: &str) -> Vec<String> {
  let mut out = vec![lemma.to_string()];
  let chars: Vec<char> = lemma.chars().collect();
  let is_vowel = |c: char| "aeiou".contains(c);

  if lemma.ends_with('e') {
    let stem = &lemma[..lemma.len() - 1];
    out.push(format!("{lemma}s"));
    out.push(format!("{lemma}d"));
    out.push(format!("{stem}ing"));
  } else if chars.len() >= 2 && chars[chars.len() - 1] == 'y' && !is_vowel(chars[chars.len() - 2]) {
    let stem = &lemma[..lemma.len() - 1];
    out.push(format!("{stem}ies"));
    out.push(format!("{stem}ied"));
    out.push(format!("{lemma}ing"));
  } else if ["s", "x", "z", "ch", "sh", "o"].iter().any(|suf| lemma.ends_with(suf)) {
    out.push(format!("{lemma}es"));
    out.push(format!("{lemma}ed"));
    out.push(format!("{lemma}ing"));
  } else {
    out.push(format!("{lemma}s"));
    out.push(format!("{lemma}ed"));
    out.push(format!("{lemma}ing"));
  }

  // Short consonant-vowel-consonant verbs double the last letter: set -> setting.
  let n = chars.len();
  if n == 3 && !is_vowel(chars[0]) && is_vowel(chars[1]) && !is_vowel(chars[2]) && !"wxy".contains(chars[2]) {
    out.push(format!("{lemma}{}ed", chars[2]));
    out.push(format!("{lemma}{}ing", chars[2]));
  }

  if let Some((_, forms)) = IRREGULAR_FORMS.iter().find(|(base, _)| *base == lemma) {
    out.extend(forms.iter().map(|f| f.to_string()));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn regular_and_irregular_inflections() {
    let give = inflections("give");
    for f in ["give", "gives", "giving", "gave", "given"] {
      assert!(give.contains(&f.to_string()), "missing {f}");
    }
    let set = inflections("set");
    assert!(set.contains(&"setting".to_string()));
    let look = inflections("look");
    for f in ["looks", "looked", "looking"] {
      assert!(look.contains(&f.to_string()));
    }
    assert!(inflections("try").contains(&"tried".to_string()));
    assert!(inflections("go").contains(&"goes".to_string()));
  }

  #[test]
  fn default_lexicon_indexes_every_phrasal_verb() {
    let lx = Lexicon::default();
    assert_eq!(lx.phrasal_len(), DEFAULT_PHRASAL_VERBS.len());
    let phrases: Vec<&str> = lx.phrasal_candidates("looked").map(|p| p.phrase.as_str()).collect();
    assert!(phrases.contains(&"look into"));
    assert!(phrases.contains(&"look forward to"));
    assert!(lx.is_connector("because"));
    assert!(!lx.is_connector("and"));
    assert!(lx.is_common("the"));
  }

  #[test]
  fn config_overrides_lists() {
    let lx = Lexicon::from_config(&LexiconConfig {
      phrasal_verbs: Some(vec!["Zone Out".into(), "nonsense".into()]),
      connectors: Some(vec!["Yet".into()]),
      max_gap: Some(0),
    });
    assert_eq!(lx.phrasal_len(), 1);
    assert_eq!(lx.phrasal_candidates("zoned").next().unwrap().phrase, "zone out");
    assert!(lx.is_connector("yet"));
    assert_eq!(lx.max_gap, 0);
  }
}
