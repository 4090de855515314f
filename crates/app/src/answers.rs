use std::fmt;

use study_core::scoring::Submission;

#[derive(Debug, PartialEq, Eq)]
pub enum AnswersError {
    MissingSeparator { entry: String },
    InvalidIndex { raw: String },
}

impl fmt::Display for AnswersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswersError::MissingSeparator { entry } => {
                write!(f, "answer `{entry}` must look like <question>=<option>[,<option>...]")
            }
            AnswersError::InvalidIndex { raw } => write!(f, "not an index: {raw}"),
        }
    }
}

impl std::error::Error for AnswersError {}

/// Parse `0=1;1=0,2` into a submission. An empty string answers nothing.
pub fn parse_answers(raw: &str) -> Result<Submission, AnswersError> {
    let mut submission = Submission::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (question, options) = entry
            .split_once('=')
            .ok_or_else(|| AnswersError::MissingSeparator {
                entry: entry.to_owned(),
            })?;
        let question = parse_index(question)?;
        let options = options
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(parse_index)
            .collect::<Result<Vec<_>, _>>()?;
        submission.set(question, options);
    }
    Ok(submission)
}

fn parse_index(raw: &str) -> Result<usize, AnswersError> {
    raw.trim().parse().map_err(|_| AnswersError::InvalidIndex {
        raw: raw.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn parses_single_and_multi_selections() {
        let submission = parse_answers("0=1; 1=2,0 ;2=").unwrap();
        assert_eq!(submission.selected(0), Some(&BTreeSet::from([1])));
        assert_eq!(submission.selected(1), Some(&BTreeSet::from([0, 2])));
        assert_eq!(submission.selected(2), Some(&BTreeSet::new()));
        assert_eq!(submission.answered(), 2);
    }

    #[test]
    fn empty_input_answers_nothing() {
        assert_eq!(parse_answers("").unwrap(), Submission::new());
    }

    #[test]
    fn rejects_malformed_entries() {
        assert_eq!(
            parse_answers("0:1").unwrap_err(),
            AnswersError::MissingSeparator {
                entry: "0:1".into()
            }
        );
        assert_eq!(
            parse_answers("0=a").unwrap_err(),
            AnswersError::InvalidIndex { raw: "a".into() }
        );
    }
}
