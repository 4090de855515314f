//! Quiz scoring: exact-set matching per question and a rounded percentage.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("quiz has no questions to score")]
    InvalidQuiz,
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Answers being built up while a user works through a quiz.
///
/// Maps a question index to the option indices currently selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    answers: BTreeMap<usize, BTreeSet<usize>>,
}

impl Submission {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection for `question` with the single `option`.
    pub fn select(&mut self, question: usize, option: usize) {
        self.answers.insert(question, BTreeSet::from([option]));
    }

    /// Add `option` to the selection for `question`, or remove it if present.
    pub fn toggle(&mut self, question: usize, option: usize) {
        let selected = self.answers.entry(question).or_default();
        if !selected.remove(&option) {
            selected.insert(option);
        }
    }

    /// Apply a tap on `option`: toggles for multi-select questions, replaces otherwise.
    pub fn choose(&mut self, index: usize, question: &Question, option: usize) {
        if question.is_multi_select() {
            self.toggle(index, option);
        } else {
            self.select(index, option);
        }
    }

    pub fn set(&mut self, question: usize, options: impl IntoIterator<Item = usize>) {
        self.answers.insert(question, options.into_iter().collect());
    }

    pub fn clear(&mut self, question: usize) {
        self.answers.remove(&question);
    }

    #[must_use]
    pub fn selected(&self, question: usize) -> Option<&BTreeSet<usize>> {
        self.answers.get(&question)
    }

    /// Number of questions with a non-empty selection.
    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.values().filter(|s| !s.is_empty()).count()
    }
}

impl FromIterator<(usize, BTreeSet<usize>)> for Submission {
    fn from_iter<T: IntoIterator<Item = (usize, BTreeSet<usize>)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Outcome of scoring one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percent: u8,
    question_results: Vec<bool>,
}

impl ScoreResult {
    /// Per-question correctness, in quiz order.
    #[must_use]
    pub fn question_results(&self) -> &[bool] {
        &self.question_results
    }
}

/// Score a submission against the quiz's answer key.
///
/// A question counts only when the selected set equals the correct set;
/// subsets and supersets are wrong. Missing answers are empty selections.
///
/// # Errors
///
/// Returns `ScoringError::InvalidQuiz` when `questions` is empty.
pub fn evaluate(questions: &[Question], submission: &Submission) -> Result<ScoreResult, ScoringError> {
    let empty = BTreeSet::new();
    let question_results: Vec<bool> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| q.is_answered_by(submission.selected(i).unwrap_or(&empty)))
        .collect();

    let total = question_results.len();
    let correct = question_results.iter().filter(|ok| **ok).count();
    let score_percent = score_percent(correct, total)?;

    Ok(ScoreResult {
        correct_count: u32::try_from(correct).unwrap_or(u32::MAX),
        total_questions: u32::try_from(total).unwrap_or(u32::MAX),
        score_percent,
        question_results,
    })
}

/// `round(100 * correct / total)` with halves rounded up, in integer arithmetic.
///
/// # Errors
///
/// Returns `ScoringError::InvalidQuiz` when `total` is zero.
pub fn score_percent(correct: usize, total: usize) -> Result<u8, ScoringError> {
    if total == 0 {
        return Err(ScoringError::InvalidQuiz);
    }
    let correct = correct.min(total);
    let rounded = (200 * correct + total) / (2 * total);
    Ok(u8::try_from(rounded).unwrap_or(100))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
