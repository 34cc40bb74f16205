//! Tokenisation helpers: words and sentences.
//!
//! Words are runs of letters/digits with optional inner apostrophes
//! ("don't", "learner’s"), lower-cased. Numbers keep their inner separators
//! ("3.50", "1,000"). Punctuation never forms a word.
//!
//! A terminator ends a sentence only when whitespace or the end of the text
//! follows it, and a lone "." after a known abbreviation ("Dr.", "e.g.") does
//! not end one.

use std::sync::LazyLock;

use regex::Regex;

// expect() is fine here: the patterns are literals.
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\p{N}+(?:[.,]\p{N}+)+|[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("Invalid regex: word pattern")
});
static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"[.!?…]+["'”’)\]]*(?:\s+|$)"#).expect("Invalid regex: sentence terminators")
});

const ABBREVIATIONS: &[&str] = &[
  "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "approx", "dept", "fig",
];

/// Lower-cased words in text order.
pub fn words(text: &str) -> Vec<String> {
  WORD_RE
    .find_iter(text)
    .map(|m| m.as_str().replace('’', "'").to_lowercase())
    .collect()
}

/// Words grouped by sentence. Segments without any word are dropped, so
/// "Hi!!! ... ok" has two sentences and "" has none.
pub fn sentences(text: &str) -> Vec<Vec<String>> {
  let mut out = Vec::new();
  let mut start = 0;
  for m in SENTENCE_END_RE.find_iter(text) {
    if ends_with_abbreviation(&text[start..m.start()], m.as_str()) {
      continue;
    }
    out.push(words(&text[start..m.start()]));
    start = m.end();
  }
  out.push(words(&text[start..]));
  out.retain(|s| !s.is_empty());
  out
}

/// True when `terminator` is a single "." closing an abbreviation such as
/// "Dr" or a dotted initialism such as "e.g" / "p.m".
fn ends_with_abbreviation(segment: &str, terminator: &str) -> bool {
  if terminator.trim_end() != "." {
    return false;
  }
  let last = segment
    .rsplit(char::is_whitespace)
    .next()
    .unwrap_or_default()
    .trim_start_matches(|c: char| !c.is_alphanumeric())
    .to_lowercase();
  if last.is_empty() {
    return false;
  }
  ABBREVIATIONS.contains(&last.as_str())
    || (last.contains('.') && last.split('.').all(|p| p.chars().count() == 1 && p.chars().all(char::is_alphabetic)))
}
