use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors from parsing a kind received off the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KindError {
    #[error("unknown assessment kind: {0}")]
    UnknownAssessmentKind(String),
    #[error("unknown question kind: {0}")]
    UnknownQuestionKind(String),
}

/// Errors from constructing a question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question content is empty")]
    EmptyContent,
    #[error("multiple choice question {0} has no options")]
    NoOptions(QuestionId),
}

//
// ─── KINDS ─────────────────────────────────────────────────────────────────────
//

/// Which placement assessment a session exercises.
///
/// Matches the service's `assessment_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssessmentKind {
    Reading,
    Writing,
    Speaking,
}

impl AssessmentKind {
    /// Canonical wire name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentKind::Reading => "reading",
            AssessmentKind::Writing => "writing",
            AssessmentKind::Speaking => "speaking",
        }
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reading" => Ok(Self::Reading),
            "writing" => Ok(Self::Writing),
            "speaking" => Ok(Self::Speaking),
            other => Err(KindError::UnknownAssessmentKind(other.to_string())),
        }
    }
}

/// The answer-capture modality of a single question.
///
/// A closed variant rather than the wire's free-form `question_type` string,
/// so dispatching on modality is exhaustive at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    Writing,
    Speaking,
}

impl QuestionKind {
    /// Canonical wire name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::Writing => "writing",
            QuestionKind::Speaking => "speaking",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "writing" => Ok(Self::Writing),
            "speaking" => Ok(Self::Speaking),
            other => Err(KindError::UnknownQuestionKind(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One served question of an assessment session.
///
/// Invariant: a multiple-choice question always carries at least one option,
/// which is what makes the "no selection defaults to the first option"
/// submission fallback total.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    content: String,
    passage: Option<String>,
    options: Vec<String>,
    lexile_level: Option<i32>,
    difficulty_logit: Option<f64>,
}

impl Question {
    /// Create a question, validating content and options against the kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyContent` if `content` is blank.
    /// Returns `QuestionError::NoOptions` for a multiple-choice question
    /// without options.
    pub fn new(
        id: QuestionId,
        kind: QuestionKind,
        content: impl Into<String>,
        passage: Option<String>,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(QuestionError::EmptyContent);
        }
        if kind == QuestionKind::MultipleChoice && options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }

        Ok(Self {
            id,
            kind,
            content,
            passage,
            options,
            lexile_level: None,
            difficulty_logit: None,
        })
    }

    /// Attach the Lexile level the service calibrated this question at.
    #[must_use]
    pub fn with_lexile_level(mut self, lexile_level: i32) -> Self {
        self.lexile_level = Some(lexile_level);
        self
    }

    /// Attach the item difficulty (logit scale) reported by the service.
    #[must_use]
    pub fn with_difficulty_logit(mut self, difficulty_logit: f64) -> Self {
        self.difficulty_logit = Some(difficulty_logit);
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// First option, present for every multiple-choice question.
    #[must_use]
    pub fn first_option(&self) -> Option<&str> {
        self.options.first().map(String::as_str)
    }

    #[must_use]
    pub fn lexile_level(&self) -> Option<i32> {
        self.lexile_level
    }

    #[must_use]
    pub fn difficulty_logit(&self) -> Option<f64> {
        self.difficulty_logit
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_wire_names() {
        for kind in [
            QuestionKind::MultipleChoice,
            QuestionKind::Writing,
            QuestionKind::Speaking,
        ] {
            assert_eq!(kind.as_str().parse::<QuestionKind>().unwrap(), kind);
        }
        for kind in [
            AssessmentKind::Reading,
            AssessmentKind::Writing,
            AssessmentKind::Speaking,
        ] {
            assert_eq!(kind.as_str().parse::<AssessmentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "listening".parse::<AssessmentKind>().unwrap_err();
        assert!(matches!(err, KindError::UnknownAssessmentKind(v) if v == "listening"));
    }

    #[test]
    fn blank_content_is_rejected() {
        let err = Question::new(
            QuestionId::new(1),
            QuestionKind::Writing,
            "   ",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyContent);
    }

    #[test]
    fn multiple_choice_requires_options() {
        let err = Question::new(
            QuestionId::new(7),
            QuestionKind::MultipleChoice,
            "Pick one",
            None,
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::NoOptions(QuestionId::new(7)));
    }

    #[test]
    fn builders_attach_metadata() {
        let question = Question::new(
            QuestionId::new(3),
            QuestionKind::MultipleChoice,
            "Choose the synonym of 'rapid'",
            Some("passage".into()),
            vec!["fast".into(), "slow".into()],
        )
        .unwrap()
        .with_lexile_level(820)
        .with_difficulty_logit(-0.4);

        assert_eq!(question.first_option(), Some("fast"));
        assert_eq!(question.lexile_level(), Some(820));
        assert_eq!(question.difficulty_logit(), Some(-0.4));
        assert_eq!(question.passage(), Some("passage"));
    }
}
