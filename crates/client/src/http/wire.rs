//! Wire shapes for the assessment service's JSON bodies.
//!
//! These mirror the service payloads field-for-field and are converted into
//! validated domain types at the boundary, so nothing downstream handles raw
//! strings or inconsistent progression flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assess_core::model::{
    AssessmentResult, Progress, Question, QuestionId, ResponseId, SessionSummary,
};

use crate::api::{
    ApiError, AudioUploadOutcome, NextOutcome, RespondNext, RespondOutcome, ResponseSubmission,
    StartedAssessment, WritingUploadOutcome,
};

#[derive(Debug, Serialize)]
pub(crate) struct StartBody {
    pub assessment_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RespondBody {
    pub question_id: u64,
    pub attempt_key: String,
    pub response_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_audio: Option<String>,
}

impl RespondBody {
    pub(crate) fn from_submission(submission: &ResponseSubmission) -> Self {
        Self {
            question_id: submission.question_id.value(),
            attempt_key: submission.attempt_key.to_string(),
            response_time: submission.response_time_secs,
            response_text: submission.response_text.clone(),
            response_audio: submission
                .response_audio_url
                .as_ref()
                .map(|url| url.as_str().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionWire {
    pub id: u64,
    pub question_type: String,
    pub content: String,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub lexile_level: Option<i32>,
    #[serde(default)]
    pub difficulty_logit: Option<f64>,
}

impl QuestionWire {
    pub(crate) fn into_question(self) -> Result<Question, ApiError> {
        let kind = self
            .question_type
            .parse()
            .map_err(|e: assess_core::model::KindError| ApiError::Decode(e.to_string()))?;
        let mut question = Question::new(
            QuestionId::new(self.id),
            kind,
            self.content,
            self.passage,
            self.options.unwrap_or_default(),
        )
        .map_err(|e| ApiError::Decode(e.to_string()))?;

        if let Some(lexile) = self.lexile_level {
            question = question.with_lexile_level(lexile);
        }
        if let Some(logit) = self.difficulty_logit {
            question = question.with_difficulty_logit(logit);
        }
        Ok(question)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressWire {
    pub current: u32,
    pub total: u32,
}

impl ProgressWire {
    pub(crate) fn into_progress(self) -> Result<Progress, ApiError> {
        Progress::new(self.current, self.total).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartWire {
    pub assessment_id: u64,
    pub question: QuestionWire,
    pub progress: ProgressWire,
}

impl StartWire {
    pub(crate) fn into_started(self) -> Result<StartedAssessment, ApiError> {
        Ok(StartedAssessment {
            assessment_id: assess_core::model::AssessmentId::new(self.assessment_id),
            question: self.question.into_question()?,
            progress: self.progress.into_progress()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RespondWire {
    pub response_id: u64,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub feedback: Option<String>,
    pub next_question_available: bool,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub result: Option<AssessmentResult>,
}

impl RespondWire {
    pub(crate) fn into_outcome(self) -> Result<RespondOutcome, ApiError> {
        let completed = self.completed.unwrap_or(false);
        let next = match (completed, self.next_question_available) {
            (true, true) => {
                return Err(ApiError::Decode(
                    "service reported completion and a next question at once".to_string(),
                ));
            }
            (true, false) => {
                let result = self.result.ok_or_else(|| {
                    ApiError::Decode("completed response carried no result".to_string())
                })?;
                RespondNext::Completed(result)
            }
            (false, true) => RespondNext::QuestionAvailable,
            (false, false) => {
                return Err(ApiError::Decode(
                    "service reported neither completion nor a next question".to_string(),
                ));
            }
        };

        Ok(RespondOutcome {
            response_id: ResponseId::new(self.response_id),
            is_correct: self.is_correct,
            feedback: self.feedback.filter(|f| !f.trim().is_empty()),
            next,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NextWire {
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub result: Option<AssessmentResult>,
    #[serde(default)]
    pub question: Option<QuestionWire>,
    #[serde(default)]
    pub progress: Option<ProgressWire>,
}

impl NextWire {
    pub(crate) fn into_outcome(self) -> Result<NextOutcome, ApiError> {
        if self.completed.unwrap_or(false) {
            let result = self.result.ok_or_else(|| {
                ApiError::Decode("completed response carried no result".to_string())
            })?;
            return Ok(NextOutcome::Completed(result));
        }

        match (self.question, self.progress) {
            (Some(question), Some(progress)) => Ok(NextOutcome::Question {
                question: question.into_question()?,
                progress: progress.into_progress()?,
            }),
            _ => Err(ApiError::Decode(
                "next response carried neither completion nor a question".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AudioUploadWire {
    pub response_id: u64,
    pub transcript: String,
    #[serde(default)]
    pub fluency_metrics: serde_json::Value,
    #[serde(default)]
    pub ai_scores: serde_json::Value,
}

impl AudioUploadWire {
    pub(crate) fn into_outcome(self) -> AudioUploadOutcome {
        AudioUploadOutcome {
            response_id: ResponseId::new(self.response_id),
            transcript: self.transcript,
            fluency_metrics: self.fluency_metrics,
            ai_scores: self.ai_scores,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WritingUploadWire {
    pub response_id: u64,
    pub text: String,
    #[serde(default)]
    pub ai_scores: serde_json::Value,
}

impl WritingUploadWire {
    pub(crate) fn into_outcome(self) -> WritingUploadOutcome {
        WritingUploadOutcome {
            response_id: ResponseId::new(self.response_id),
            text: self.text,
            ai_scores: self.ai_scores,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionSummaryWire {
    pub id: u64,
    pub assessment_type: String,
    pub status: String,
    #[serde(default)]
    pub cefr_level: Option<String>,
    #[serde(default)]
    pub lexile_estimate: Option<i32>,
    #[serde(default)]
    pub theta_score: Option<f64>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionSummaryWire {
    pub(crate) fn into_summary(self) -> Result<SessionSummary, ApiError> {
        let kind = self
            .assessment_type
            .parse()
            .map_err(|e: assess_core::model::KindError| ApiError::Decode(e.to_string()))?;
        let status = self
            .status
            .parse()
            .map_err(|e: assess_core::model::ParseStatusError| ApiError::Decode(e.to_string()))?;

        let mut summary = SessionSummary::new(
            assess_core::model::AssessmentId::new(self.id),
            kind,
            status,
            self.started_at,
        );
        summary.cefr_level = self.cefr_level;
        summary.lexile_estimate = self.lexile_estimate;
        summary.theta_score = self.theta_score;
        summary.completed_at = self.completed_at;
        Ok(summary)
    }
}
