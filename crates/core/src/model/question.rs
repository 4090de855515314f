use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question.
///
/// `correct_options` holds indices into `options`. A question with more than
/// one correct index is answered by selecting exactly that set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_options: BTreeSet<usize>,
}

impl Question {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_options: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            text: text.into(),
            options,
            correct_options: correct_options.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.correct_options.len() > 1
    }

    /// True when `selected` is exactly the set of correct indices.
    #[must_use]
    pub fn is_answered_by(&self, selected: &BTreeSet<usize>) -> bool {
        *selected == self.correct_options
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

/// Errors raised while turning stored question text into `Question`s.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionCodecError {
    #[error("questions are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("questions must be a JSON array, found {0}")]
    UnexpectedShape(&'static str),
}

#[derive(Serialize, Deserialize)]
struct WireQuestion {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctOptions")]
    correct_options: Vec<usize>,
}

impl From<&Question> for WireQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.text.clone(),
            options: q.options.clone(),
            correct_options: q.correct_options.iter().copied().collect(),
        }
    }
}

impl From<WireQuestion> for Question {
    fn from(w: WireQuestion) -> Self {
        Self {
            text: w.question,
            options: w.options,
            correct_options: w.correct_options.into_iter().collect(),
        }
    }
}

/// Serializes questions into the stored text form.
///
/// # Errors
///
/// Returns `QuestionCodecError::Json` if serialization fails.
pub fn encode_questions(questions: &[Question]) -> Result<String, QuestionCodecError> {
    let wire: Vec<WireQuestion> = questions.iter().map(WireQuestion::from).collect();
    Ok(serde_json::to_string(&wire)?)
}

/// Parses the stored text form back into questions.
///
/// Accepts the plain JSON array, the same array wrapped once more in a JSON
/// string (older rows were written that way), and `null` as an empty list.
///
/// # Errors
///
/// Returns `QuestionCodecError` if the text is not one of those shapes.
pub fn decode_questions(raw: &str) -> Result<Vec<Question>, QuestionCodecError> {
    let value: Value = serde_json::from_str(raw)?;
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner)?,
        other => other,
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => {
            let wire: Vec<WireQuestion> = serde_json::from_value(value)?;
            Ok(wire.into_iter().map(Question::from).collect())
        }
        Value::Bool(_) => Err(QuestionCodecError::UnexpectedShape("a boolean")),
        Value::Number(_) => Err(QuestionCodecError::UnexpectedShape("a number")),
        Value::String(_) => Err(QuestionCodecError::UnexpectedShape("a string")),
        Value::Object(_) => Err(QuestionCodecError::UnexpectedShape("an object")),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
