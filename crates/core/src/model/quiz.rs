use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::category::Category;
use crate::model::ids::{CategoryId, QuizId, UserId};
use crate::model::question::Question;

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

//
// ─── VALIDATION ERRORS ─────────────────────────────────────────────────────────
//

/// The authoring field a validation failure points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizField {
    Title,
    Category,
    Questions,
    QuestionText { question: usize },
    Options { question: usize },
    OptionText { question: usize, option: usize },
    CorrectOptions { question: usize },
}

impl fmt::Display for QuizField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizField::Title => write!(f, "title"),
            QuizField::Category => write!(f, "category"),
            QuizField::Questions => write!(f, "questions"),
            QuizField::QuestionText { question } => write!(f, "questions[{question}].text"),
            QuizField::Options { question } => write!(f, "questions[{question}].options"),
            QuizField::OptionText { question, option } => {
                write!(f, "questions[{question}].options[{option}]")
            }
            QuizField::CorrectOptions { question } => {
                write!(f, "questions[{question}].correctOptions")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizValidationError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("a category must be selected")]
    MissingCategory,

    #[error("category {0} does not exist")]
    UnknownCategory(CategoryId),

    #[error("a quiz needs at least one question")]
    NoQuestions,

    #[error("question {question} has no text")]
    EmptyQuestionText { question: usize },

    #[error("question {question} has {count} options, at least 2 are required")]
    TooFewOptions { question: usize, count: usize },

    #[error("option {option} of question {question} is empty")]
    EmptyOption { question: usize, option: usize },

    #[error("question {question} has no correct option")]
    NoCorrectOption { question: usize },

    #[error("question {question} marks option {index} correct but only has {options} options")]
    CorrectOptionOutOfRange {
        question: usize,
        index: usize,
        options: usize,
    },
}

impl QuizValidationError {
    /// The field that failed validation.
    #[must_use]
    pub fn field(&self) -> QuizField {
        match *self {
            Self::EmptyTitle => QuizField::Title,
            Self::MissingCategory | Self::UnknownCategory(_) => QuizField::Category,
            Self::NoQuestions => QuizField::Questions,
            Self::EmptyQuestionText { question } => QuizField::QuestionText { question },
            Self::TooFewOptions { question, .. } => QuizField::Options { question },
            Self::EmptyOption { question, option } => QuizField::OptionText { question, option },
            Self::NoCorrectOption { question } | Self::CorrectOptionOutOfRange { question, .. } => {
                QuizField::CorrectOptions { question }
            }
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated authoring input for creating or updating a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub title: String,
    pub category_id: Option<CategoryId>,
    pub questions: Vec<Question>,
}

impl QuizDraft {
    /// Checks every authoring rule, stopping at the first failure.
    ///
    /// Text fields are trimmed in the returned quiz.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizValidationError` encountered, in field order.
    pub fn validate(
        self,
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> Result<ValidatedQuiz, QuizValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(QuizValidationError::EmptyTitle);
        }

        let category_id = self.category_id.ok_or(QuizValidationError::MissingCategory)?;
        if !categories.iter().any(|c| c.id == category_id) {
            return Err(QuizValidationError::UnknownCategory(category_id));
        }

        if self.questions.is_empty() {
            return Err(QuizValidationError::NoQuestions);
        }

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| validate_question(i, q))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedQuiz {
            title: title.to_owned(),
            category_id,
            questions,
            created_at: now,
        })
    }
}

fn validate_question(index: usize, question: Question) -> Result<Question, QuizValidationError> {
    let text = question.text.trim();
    if text.is_empty() {
        return Err(QuizValidationError::EmptyQuestionText { question: index });
    }

    if question.options.len() < MIN_OPTIONS {
        return Err(QuizValidationError::TooFewOptions {
            question: index,
            count: question.options.len(),
        });
    }

    let mut options = Vec::with_capacity(question.options.len());
    for (j, option) in question.options.iter().enumerate() {
        let option = option.trim();
        if option.is_empty() {
            return Err(QuizValidationError::EmptyOption {
                question: index,
                option: j,
            });
        }
        options.push(option.to_owned());
    }

    if question.correct_options.is_empty() {
        return Err(QuizValidationError::NoCorrectOption { question: index });
    }
    if let Some(&bad) = question.correct_options.iter().find(|&&i| i >= options.len()) {
        return Err(QuizValidationError::CorrectOptionOutOfRange {
            question: index,
            index: bad,
            options: options.len(),
        });
    }

    Ok(Question {
        text: text.to_owned(),
        options,
        correct_options: question.correct_options,
    })
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A quiz that passed authoring validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    pub title: String,
    pub category_id: CategoryId,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuiz {
    #[must_use]
    pub fn assign_id(self, id: QuizId, owner_id: UserId) -> Quiz {
        Quiz {
            id,
            owner_id,
            title: self.title,
            category_id: Some(self.category_id),
            questions: self.questions,
            created_at: self.created_at,
        }
    }
}

/// A stored quiz with its questions decoded.
///
/// `category_id` is `None` when the category row was removed after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: QuizId,
    pub owner_id: UserId,
    pub title: String,
    pub category_id: Option<CategoryId>,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
