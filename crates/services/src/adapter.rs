use thiserror::Error;

use assess_core::model::{AttemptKey, Question, QuestionKind};
use client::{AudioUpload, ImageUpload, ResponseSubmission};

/// Marker submitted when a question closes with nothing captured.
pub const NO_RESPONSE_TEXT: &str = "No response provided";

//
// ─── CAPTURED ANSWERS ──────────────────────────────────────────────────────────
//

/// An answer captured by the UI layer for one question, by modality.
///
/// Every field is optional: the timeout path submits whatever partial answer
/// exists, and normalization supplies the well-defined default for the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedAnswer {
    MultipleChoice {
        selected: Option<usize>,
    },
    Writing {
        text: Option<String>,
        image: Option<ImageUpload>,
    },
    Speaking {
        recording: Option<AudioUpload>,
    },
}

impl CapturedAnswer {
    /// The empty answer for a question kind, submitted on timeout.
    #[must_use]
    pub fn empty_for(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::MultipleChoice => Self::MultipleChoice { selected: None },
            QuestionKind::Writing => Self::Writing {
                text: None,
                image: None,
            },
            QuestionKind::Speaking => Self::Speaking { recording: None },
        }
    }

    /// The modality this answer was captured for.
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            Self::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            Self::Writing { .. } => QuestionKind::Writing,
            Self::Speaking { .. } => QuestionKind::Speaking,
        }
    }
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("answer modality {answer} does not match question kind {question}")]
    ModalityMismatch {
        question: QuestionKind,
        answer: QuestionKind,
    },
    #[error("selected option {index} is out of range ({len} options)")]
    SelectionOutOfRange { index: usize, len: usize },
}

/// One normalized submission: the standard respond envelope, or one of the
/// dedicated upload calls.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPlan {
    Respond(ResponseSubmission),
    UploadWriting {
        text: Option<String>,
        image: ImageUpload,
    },
    UploadAudio {
        recording: AudioUpload,
    },
}

/// Normalize a captured answer against its question into a submission plan.
///
/// Defaults when nothing was captured: a multiple-choice submission falls
/// back to the first option, every other modality to [`NO_RESPONSE_TEXT`]
/// through the standard envelope. A well-formed pair always yields exactly
/// one plan.
///
/// # Errors
///
/// Returns `AdapterError::ModalityMismatch` when the answer was captured for
/// a different kind of question, and `AdapterError::SelectionOutOfRange` for
/// an option index past the end of the list.
pub fn normalize(
    question: &Question,
    answer: CapturedAnswer,
    attempt_key: AttemptKey,
    response_time_secs: f64,
) -> Result<SubmissionPlan, AdapterError> {
    if answer.kind() != question.kind() {
        return Err(AdapterError::ModalityMismatch {
            question: question.kind(),
            answer: answer.kind(),
        });
    }

    let envelope = |text: String| {
        SubmissionPlan::Respond(ResponseSubmission {
            question_id: question.id(),
            attempt_key,
            response_time_secs,
            response_text: Some(text),
            response_audio_url: None,
        })
    };

    match answer {
        CapturedAnswer::MultipleChoice { selected } => {
            let options = question.options();
            let text = match selected {
                Some(index) => options.get(index).cloned().ok_or(
                    AdapterError::SelectionOutOfRange {
                        index,
                        len: options.len(),
                    },
                )?,
                None => question
                    .first_option()
                    .map_or_else(|| NO_RESPONSE_TEXT.to_string(), str::to_string),
            };
            Ok(envelope(text))
        }
        CapturedAnswer::Writing { text, image } => {
            let text = text.filter(|t| !t.trim().is_empty());
            match image {
                Some(image) => Ok(SubmissionPlan::UploadWriting { text, image }),
                None => Ok(envelope(
                    text.unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()),
                )),
            }
        }
        CapturedAnswer::Speaking { recording } => match recording {
            Some(recording) => Ok(SubmissionPlan::UploadAudio { recording }),
            None => Ok(envelope(NO_RESPONSE_TEXT.to_string())),
        },
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
