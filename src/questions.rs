//! Question bank: a narrow repository interface plus the selection policy.
//!
//! Selection is dispatched on the tagged `QuestionMix` / `SearchStrategy`
//! values from `QuestionsConfig`; the RNG is passed in so tests can seed it.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, instrument};

use crate::domain::{Question, QuestionKind, QuestionMix, QuestionsConfig, SearchStrategy, StartingPack};
use crate::error::QuestionError;

pub trait QuestionRepository: Send + Sync {
  /// Active questions, optionally restricted to one kind, ordered by id.
  fn find_active(&self, kind: Option<QuestionKind>) -> Vec<Question>;
  /// Questions with the given ids, in the order the ids were given. Unknown
  /// ids are skipped; the active flag is not checked.
  fn find_by_ids(&self, ids: &[u32]) -> Vec<Question>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryQuestionRepository {
  by_id: BTreeMap<u32, Question>,
}

impl InMemoryQuestionRepository {
  /// Later entries with an existing id are ignored.
  pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
    let mut by_id = BTreeMap::new();
    for q in questions {
      by_id.entry(q.id).or_insert(q);
    }
    Self { by_id }
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }
}

impl QuestionRepository for InMemoryQuestionRepository {
  fn find_active(&self, kind: Option<QuestionKind>) -> Vec<Question> {
    self
      .by_id
      .values()
      .filter(|q| q.active && kind.map_or(true, |k| q.kind == k))
      .cloned()
      .collect()
  }

  fn find_by_ids(&self, ids: &[u32]) -> Vec<Question> {
    ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect()
  }
}

/// Pick the next set of questions according to the configured strategies.
/// Returns the questions and a short label of the path taken (for logs).
#[instrument(level = "debug", skip(repo, cfg, rng), fields(mix = ?cfg.mix, search = ?cfg.search))]
pub fn select_questions<R: Rng + ?Sized>(
  repo: &dyn QuestionRepository,
  cfg: &QuestionsConfig,
  rng: &mut R,
) -> Result<(Vec<Question>, &'static str), QuestionError> {
  match &cfg.mix {
    QuestionMix::Random { scenario_probability } => {
      if rng.gen::<f64>() < *scenario_probability {
        scenario_set(repo, &cfg.search, rng).map(|qs| (qs, "random_scenario"))
      } else {
        normal_set(repo, &cfg.search, rng).map(|qs| (qs, "random_normal"))
      }
    }
    QuestionMix::Normal => normal_set(repo, &cfg.search, rng).map(|qs| (qs, "normal")),
    QuestionMix::Scenario => scenario_set(repo, &cfg.search, rng).map(|qs| (qs, "scenario")),
  }
}

fn scenario_set<R: Rng + ?Sized>(
  repo: &dyn QuestionRepository,
  search: &SearchStrategy,
  rng: &mut R,
) -> Result<Vec<Question>, QuestionError> {
  let pool = match search {
    SearchStrategy::Random => repo.find_active(Some(QuestionKind::Scenario)),
    SearchStrategy::Hardcoded { ids } => repo.find_by_ids(ids),
  };
  pool
    .choose(rng)
    .cloned()
    .map(|q| vec![q])
    .ok_or_else(|| QuestionError::NoQuestions("scenario set".into()))
}

fn normal_set<R: Rng + ?Sized>(
  repo: &dyn QuestionRepository,
  search: &SearchStrategy,
  rng: &mut R,
) -> Result<Vec<Question>, QuestionError> {
  match search {
    SearchStrategy::Hardcoded { ids } => {
      let qs = repo.find_by_ids(ids);
      if qs.is_empty() {
        return Err(QuestionError::NoQuestions(format!("hardcoded ids {ids:?}")));
      }
      Ok(qs)
    }
    SearchStrategy::Random => {
      let describe = repo
        .find_active(Some(QuestionKind::Describe))
        .choose(rng)
        .cloned()
        .ok_or_else(|| QuestionError::NoQuestions("describe".into()))?;

      let active = repo.find_active(None);
      let quiz_pool: Vec<&Question> = active
        .iter()
        .filter(|q| !matches!(q.kind, QuestionKind::Describe | QuestionKind::Scenario))
        .collect();
      let quiz = (*quiz_pool
        .choose(rng)
        .ok_or_else(|| QuestionError::NoQuestions("quiz".into()))?)
      .clone();

      let rest: Vec<&Question> = active
        .iter()
        .filter(|q| q.kind != QuestionKind::Scenario && q.id != describe.id && q.id != quiz.id)
        .collect();
      let third = (*rest
        .choose(rng)
        .ok_or_else(|| QuestionError::NoQuestions("third normal question".into()))?)
      .clone();

      debug!(target: "questions", describe = describe.id, quiz = quiz.id, third = third.id, "Normal set picked");
      Ok(vec![describe, quiz, third])
    }
  }
}

/// Questions of the first starting pack the learner has not viewed yet.
pub fn first_time_questions(
  repo: &dyn QuestionRepository,
  viewed_pack_ids: &[u32],
  packs: &[StartingPack],
) -> Vec<Question> {
  packs
    .iter()
    .find(|p| !viewed_pack_ids.contains(&p.id))
    .map(|p| repo.find_by_ids(&p.question_ids))
    .unwrap_or_default()
}
