use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use url::Url;

use assess_core::model::{
    AssessmentId, AssessmentKind, AssessmentResult, AttemptKey, Progress, Question, QuestionId,
    ResponseId, SessionStatus, SessionSummary, UserId,
};

/// Errors surfaced by assessment service adapters.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("assessment service unreachable: {0}")]
    Unreachable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service rejected the request ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("could not decode service response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

//
// ─── SUBMISSION & OUTCOME TYPES ────────────────────────────────────────────────
//

/// The normalized envelope for a standard respond call.
///
/// `attempt_key` identifies one presentation of the question and is reused
/// verbatim when the same submission is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSubmission {
    pub question_id: QuestionId,
    pub attempt_key: AttemptKey,
    pub response_time_secs: f64,
    pub response_text: Option<String>,
    pub response_audio_url: Option<Url>,
}

/// Payload returned by a successful `start` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedAssessment {
    pub assessment_id: AssessmentId,
    pub question: Question,
    pub progress: Progress,
}

/// What the service decided after accepting a response.
///
/// A closed alternative: the session either has a further question to fetch
/// or is complete with a result — never both, never neither.
#[derive(Debug, Clone, PartialEq)]
pub enum RespondNext {
    QuestionAvailable,
    Completed(AssessmentResult),
}

/// Acknowledgement of an accepted response.
#[derive(Debug, Clone, PartialEq)]
pub struct RespondOutcome {
    pub response_id: ResponseId,
    pub is_correct: Option<bool>,
    pub feedback: Option<String>,
    pub next: RespondNext,
}

/// Result of asking for the next question.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    Question { question: Question, progress: Progress },
    Completed(AssessmentResult),
}

/// A captured audio recording for a speaking question.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// A captured image of handwritten work for a writing question.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Service acknowledgement of an audio upload.
///
/// Transcription and scoring detail stay opaque JSON; the session layer only
/// folds the transcript and response id into its history.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUploadOutcome {
    pub response_id: ResponseId,
    pub transcript: String,
    pub fluency_metrics: serde_json::Value,
    pub ai_scores: serde_json::Value,
}

/// Service acknowledgement of a writing upload.
#[derive(Debug, Clone, PartialEq)]
pub struct WritingUploadOutcome {
    pub response_id: ResponseId,
    pub text: String,
    pub ai_scores: serde_json::Value,
}

//
// ─── SERVICE CONTRACT ──────────────────────────────────────────────────────────
//

/// Contract for the assessment service's session lifecycle endpoints.
///
/// Mutating operations (`start`, `respond`, `next_question`, the uploads,
/// `submit`) are never retried by an adapter; only the read-only operations
/// (`result`, `list_sessions`) are safe for callers to retry freely.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Start a new assessment session of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when the service has no questions for
    /// the kind, or other service errors.
    async fn start(&self, kind: AssessmentKind) -> Result<StartedAssessment, ApiError>;

    /// Submit a normalized response for the current question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the service rejects or never receives the
    /// submission; the caller decides whether to retry.
    async fn respond(
        &self,
        assessment_id: AssessmentId,
        submission: ResponseSubmission,
    ) -> Result<RespondOutcome, ApiError>;

    /// Fetch the next question, or learn that the session completed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for service failures.
    async fn next_question(&self, assessment_id: AssessmentId) -> Result<NextOutcome, ApiError>;

    /// Upload a speaking recording; the service transcribes and scores it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for service failures.
    async fn upload_audio(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        audio: AudioUpload,
    ) -> Result<AudioUploadOutcome, ApiError>;

    /// Upload writing as free text, an image of handwriting, or both.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for service failures.
    async fn upload_writing(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<WritingUploadOutcome, ApiError>;

    /// Explicitly finalize the session and obtain the scored result.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for service failures.
    async fn submit(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError>;

    /// Fetch the result of a completed session. Read-only and retry-safe.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown session, or other
    /// service errors.
    async fn result(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError>;

    /// List the user's past and in-flight sessions. Read-only and retry-safe.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for service failures.
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<SessionSummary>, ApiError>;
}

//
// ─── IN-MEMORY SERVICE ─────────────────────────────────────────────────────────
//

/// Scripted in-memory assessment service for tests and prototyping.
///
/// Serves a fixed question list in order, records accepted submissions, and
/// completes with a canned result once every question is answered. Repeated
/// `respond` calls carrying an already-accepted `AttemptKey` return the
/// original acknowledgement instead of recording a duplicate.
#[derive(Clone)]
pub struct InMemoryAssessmentService {
    script: Vec<Question>,
    result: AssessmentResult,
    correct_answers: HashMap<QuestionId, String>,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    last_assessment_id: u64,
    last_response_id: u64,
    sessions: HashMap<AssessmentId, SessionRecord>,
}

struct SessionRecord {
    kind: AssessmentKind,
    served: usize,
    answered: usize,
    accepted: HashMap<AttemptKey, RespondOutcome>,
    completed: bool,
    started_at: DateTime<Utc>,
}

impl InMemoryAssessmentService {
    #[must_use]
    pub fn new(script: Vec<Question>, result: AssessmentResult) -> Self {
        Self {
            script,
            result,
            correct_answers: HashMap::new(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Configure expected answers so `respond` reports correctness.
    #[must_use]
    pub fn with_correct_answers(mut self, answers: HashMap<QuestionId, String>) -> Self {
        self.correct_answers = answers;
        self
    }

    /// Number of submissions accepted for the given session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown session.
    pub fn accepted_count(&self, assessment_id: AssessmentId) -> Result<usize, ApiError> {
        let inner = self.lock()?;
        let record = session(&inner, assessment_id)?;
        Ok(record.answered)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, ApiError> {
        self.inner
            .lock()
            .map_err(|e| ApiError::Unreachable(e.to_string()))
    }

    fn total(&self) -> u32 {
        u32::try_from(self.script.len()).unwrap_or(u32::MAX)
    }

    fn completed_result(&self, assessment_id: AssessmentId) -> AssessmentResult {
        let mut result = self.result.clone();
        result.assessment_id = Some(assessment_id);
        result
    }

    fn progress(&self, served: usize) -> Result<Progress, ApiError> {
        let current = u32::try_from(served).unwrap_or(u32::MAX);
        Progress::new(current, self.total()).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn record_answer(
        record: &mut SessionRecord,
        total: usize,
    ) -> Result<(), ApiError> {
        if record.completed {
            return Err(ApiError::Status {
                status: 400,
                message: "Assessment not in progress".to_string(),
            });
        }
        record.answered += 1;
        if record.answered >= total {
            record.completed = true;
        }
        Ok(())
    }
}

fn session(inner: &Inner, assessment_id: AssessmentId) -> Result<&SessionRecord, ApiError> {
    inner
        .sessions
        .get(&assessment_id)
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))
}

fn session_mut(
    inner: &mut Inner,
    assessment_id: AssessmentId,
) -> Result<&mut SessionRecord, ApiError> {
    inner
        .sessions
        .get_mut(&assessment_id)
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))
}

#[async_trait]
impl AssessmentApi for InMemoryAssessmentService {
    async fn start(&self, kind: AssessmentKind) -> Result<StartedAssessment, ApiError> {
        let Some(first) = self.script.first().cloned() else {
            return Err(ApiError::NotFound(
                "No questions available for this assessment type".to_string(),
            ));
        };

        let mut inner = self.lock()?;
        inner.last_assessment_id += 1;
        let assessment_id = AssessmentId::new(inner.last_assessment_id);
        inner.sessions.insert(
            assessment_id,
            SessionRecord {
                kind,
                served: 1,
                answered: 0,
                accepted: HashMap::new(),
                completed: false,
                started_at: Utc::now(),
            },
        );

        Ok(StartedAssessment {
            assessment_id,
            question: first,
            progress: self.progress(1)?,
        })
    }

    async fn respond(
        &self,
        assessment_id: AssessmentId,
        submission: ResponseSubmission,
    ) -> Result<RespondOutcome, ApiError> {
        let total = self.script.len();
        let is_correct = self.correct_answers.get(&submission.question_id).map(|expected| {
            submission.response_text.as_deref() == Some(expected.as_str())
        });
        let result = self.completed_result(assessment_id);

        let mut inner = self.lock()?;
        inner.last_response_id += 1;
        let response_id = ResponseId::new(inner.last_response_id);
        let record = session_mut(&mut inner, assessment_id)?;

        if let Some(previous) = record.accepted.get(&submission.attempt_key) {
            return Ok(previous.clone());
        }

        InMemoryAssessmentService::record_answer(record, total)?;
        let next = if record.completed {
            RespondNext::Completed(result)
        } else {
            RespondNext::QuestionAvailable
        };
        let outcome = RespondOutcome {
            response_id,
            is_correct,
            feedback: None,
            next,
        };
        record
            .accepted
            .insert(submission.attempt_key, outcome.clone());
        Ok(outcome)
    }

    async fn next_question(&self, assessment_id: AssessmentId) -> Result<NextOutcome, ApiError> {
        let result = self.completed_result(assessment_id);
        let mut inner = self.lock()?;
        let record = session_mut(&mut inner, assessment_id)?;

        if record.completed {
            return Ok(NextOutcome::Completed(result));
        }
        let Some(question) = self.script.get(record.served).cloned() else {
            record.completed = true;
            return Ok(NextOutcome::Completed(result));
        };
        record.served += 1;
        let progress = self.progress(record.served)?;
        Ok(NextOutcome::Question { question, progress })
    }

    async fn upload_audio(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        audio: AudioUpload,
    ) -> Result<AudioUploadOutcome, ApiError> {
        let total = self.script.len();
        let mut inner = self.lock()?;
        inner.last_response_id += 1;
        let response_id = ResponseId::new(inner.last_response_id);
        let record = session_mut(&mut inner, assessment_id)?;
        InMemoryAssessmentService::record_answer(record, total)?;

        Ok(AudioUploadOutcome {
            response_id,
            transcript: format!("transcript of {} for question {question_id}", audio.file_name),
            fluency_metrics: serde_json::json!({"words_per_minute": 110.0, "pause_count": 3}),
            ai_scores: serde_json::json!({"overall_score": 3.5}),
        })
    }

    async fn upload_writing(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<WritingUploadOutcome, ApiError> {
        if text.is_none() && image.is_none() {
            return Err(ApiError::Status {
                status: 400,
                message: "Writing processing failed: no content provided".to_string(),
            });
        }

        let total = self.script.len();
        let mut inner = self.lock()?;
        inner.last_response_id += 1;
        let response_id = ResponseId::new(inner.last_response_id);
        let record = session_mut(&mut inner, assessment_id)?;
        InMemoryAssessmentService::record_answer(record, total)?;

        let recognized = text.unwrap_or_else(|| {
            format!("recognized text for question {question_id}")
        });
        Ok(WritingUploadOutcome {
            response_id,
            text: recognized,
            ai_scores: serde_json::json!({"overall_score": 3.0}),
        })
    }

    async fn submit(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError> {
        let result = self.completed_result(assessment_id);
        let mut inner = self.lock()?;
        let record = session_mut(&mut inner, assessment_id)?;
        record.completed = true;
        Ok(result)
    }

    async fn result(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError> {
        let inner = self.lock()?;
        let record = session(&inner, assessment_id)?;
        if !record.completed {
            return Err(ApiError::Status {
                status: 400,
                message: "Assessment not completed".to_string(),
            });
        }
        Ok(self.completed_result(assessment_id))
    }

    async fn list_sessions(&self, _user_id: UserId) -> Result<Vec<SessionSummary>, ApiError> {
        let inner = self.lock()?;
        let mut rows: Vec<SessionSummary> = inner
            .sessions
            .iter()
            .map(|(id, record)| {
                let status = if record.completed {
                    SessionStatus::Completed
                } else {
                    SessionStatus::InProgress
                };
                let mut row = SessionSummary::new(*id, record.kind, status, record.started_at);
                if record.completed {
                    row.cefr_level = Some(self.result.cefr_level.clone());
                    row.lexile_estimate = self.result.lexile_estimate;
                    row.theta_score = Some(self.result.theta_score);
                }
                row
            })
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::QuestionKind;

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            QuestionKind::MultipleChoice,
            format!("Question {id}"),
            None,
            vec!["alpha".to_string(), "beta".to_string()],
        )
        .unwrap()
    }

    fn build_result() -> AssessmentResult {
        AssessmentResult {
            cefr_level: "B1".to_string(),
            ..AssessmentResult::default()
        }
    }

    fn submission(question_id: QuestionId, text: &str) -> ResponseSubmission {
        ResponseSubmission {
            question_id,
            attempt_key: AttemptKey::generate(),
            response_time_secs: 4.0,
            response_text: Some(text.to_string()),
            response_audio_url: None,
        }
    }

    #[tokio::test]
    async fn serves_script_in_order_and_completes() {
        let service =
            InMemoryAssessmentService::new(vec![build_question(1), build_question(2)], build_result());

        let started = service.start(AssessmentKind::Reading).await.unwrap();
        assert_eq!(started.question.id(), QuestionId::new(1));
        assert_eq!(started.progress, Progress::new(1, 2).unwrap());

        let outcome = service
            .respond(started.assessment_id, submission(QuestionId::new(1), "alpha"))
            .await
            .unwrap();
        assert_eq!(outcome.next, RespondNext::QuestionAvailable);

        let next = service.next_question(started.assessment_id).await.unwrap();
        let NextOutcome::Question { question, progress } = next else {
            panic!("expected a second question");
        };
        assert_eq!(question.id(), QuestionId::new(2));
        assert_eq!(progress, Progress::new(2, 2).unwrap());

        let outcome = service
            .respond(started.assessment_id, submission(QuestionId::new(2), "beta"))
            .await
            .unwrap();
        let RespondNext::Completed(result) = outcome.next else {
            panic!("expected completion on the final answer");
        };
        assert_eq!(result.cefr_level, "B1");
        assert_eq!(result.assessment_id, Some(started.assessment_id));
    }

    #[tokio::test]
    async fn repeated_attempt_key_is_deduplicated() {
        let service =
            InMemoryAssessmentService::new(vec![build_question(1), build_question(2)], build_result());
        let started = service.start(AssessmentKind::Reading).await.unwrap();

        let envelope = submission(QuestionId::new(1), "alpha");
        let first = service
            .respond(started.assessment_id, envelope.clone())
            .await
            .unwrap();
        let second = service
            .respond(started.assessment_id, envelope)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(service.accepted_count(started.assessment_id).unwrap(), 1);
    }

    #[tokio::test]
    async fn correctness_is_reported_when_configured() {
        let answers = HashMap::from([(QuestionId::new(1), "alpha".to_string())]);
        let service =
            InMemoryAssessmentService::new(vec![build_question(1), build_question(2)], build_result())
                .with_correct_answers(answers);
        let started = service.start(AssessmentKind::Reading).await.unwrap();

        let outcome = service
            .respond(started.assessment_id, submission(QuestionId::new(1), "beta"))
            .await
            .unwrap();
        assert_eq!(outcome.is_correct, Some(false));
    }

    #[tokio::test]
    async fn result_requires_completion() {
        let service = InMemoryAssessmentService::new(vec![build_question(1)], build_result());
        let started = service.start(AssessmentKind::Reading).await.unwrap();

        let err = service.result(started.assessment_id).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 400, .. }));

        service
            .respond(started.assessment_id, submission(QuestionId::new(1), "alpha"))
            .await
            .unwrap();
        let result = service.result(started.assessment_id).await.unwrap();
        assert_eq!(result.cefr_level, "B1");
    }

    #[tokio::test]
    async fn empty_script_cannot_start() {
        let service = InMemoryAssessmentService::new(Vec::new(), build_result());
        let err = service.start(AssessmentKind::Reading).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
