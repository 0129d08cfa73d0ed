use chrono::{DateTime, Utc};

use assess_core::model::{
    AssessmentId, AssessmentKind, AssessmentResult, AttemptKey, Progress, ProgressError, Question,
    RecordedResponse, SessionStatus,
};

//
// ─── OPEN QUESTION ─────────────────────────────────────────────────────────────
//

/// The single question currently open for answering.
///
/// Carries the idempotency key minted for this presentation and the time it
/// was shown, which anchors both the countdown and the reported response
/// time. Retrying a failed submission reuses the same key; presenting the
/// next question mints a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenQuestion {
    question: Question,
    attempt_key: AttemptKey,
    presented_at: DateTime<Utc>,
}

impl OpenQuestion {
    pub(crate) fn new(question: Question, presented_at: DateTime<Utc>) -> Self {
        Self {
            question,
            attempt_key: AttemptKey::generate(),
            presented_at,
        }
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn attempt_key(&self) -> AttemptKey {
        self.attempt_key
    }

    #[must_use]
    pub fn presented_at(&self) -> DateTime<Utc> {
        self.presented_at
    }
}

//
// ─── ACTIVE SESSION ────────────────────────────────────────────────────────────
//

/// Live state of an in-progress session.
///
/// At most one question is open at any time. Between an accepted response and
/// the arrival of the next question no question is open and the session is
/// awaiting a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    assessment_id: AssessmentId,
    kind: AssessmentKind,
    progress: Progress,
    open: Option<OpenQuestion>,
    responses: Vec<RecordedResponse>,
    started_at: DateTime<Utc>,
}

impl ActiveSession {
    pub(crate) fn new(
        assessment_id: AssessmentId,
        kind: AssessmentKind,
        question: Question,
        progress: Progress,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            assessment_id,
            kind,
            progress,
            open: Some(OpenQuestion::new(question, started_at)),
            responses: Vec::new(),
            started_at,
        }
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn open(&self) -> Option<&OpenQuestion> {
        self.open.as_ref()
    }

    #[must_use]
    pub fn responses(&self) -> &[RecordedResponse] {
        &self.responses
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of responses the service has accepted so far.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.responses.len()
    }

    /// True when a response was accepted but the next question has not been
    /// presented yet.
    #[must_use]
    pub fn awaiting_next(&self) -> bool {
        self.open.is_none()
    }

    /// Append an accepted response to the history.
    pub(crate) fn record(&mut self, response: RecordedResponse) {
        self.responses.push(response);
    }

    /// Close the open question once its response was accepted.
    pub(crate) fn close_question(&mut self) -> Option<OpenQuestion> {
        self.open.take()
    }

    /// Present the next question at the server-reported progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when the reported progress regresses or its
    /// total moved; the question is not presented in that case.
    pub(crate) fn present(
        &mut self,
        question: Question,
        progress: Progress,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        self.progress.advance_to(progress)?;
        self.open = Some(OpenQuestion::new(question, now));
        Ok(())
    }
}

//
// ─── FINISHED SESSION ──────────────────────────────────────────────────────────
//

/// A completed session retained for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSession {
    assessment_id: AssessmentId,
    kind: AssessmentKind,
    progress: Progress,
    responses: Vec<RecordedResponse>,
    result: AssessmentResult,
    completed_at: DateTime<Utc>,
}

impl FinishedSession {
    /// Fold a live session and its result into the terminal state.
    ///
    /// Progress is forced to the end: completion is signaled explicitly by
    /// the service, and the two paths it can arrive on (respond or next)
    /// converge here.
    pub(crate) fn from_active(
        active: ActiveSession,
        result: AssessmentResult,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let mut progress = active.progress;
        progress.complete();
        Self {
            assessment_id: active.assessment_id,
            kind: active.kind,
            progress,
            responses: active.responses,
            result,
            completed_at,
        }
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn responses(&self) -> &[RecordedResponse] {
        &self.responses
    }

    #[must_use]
    pub fn result(&self) -> &AssessmentResult {
        &self.result
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Whole-session state machine: `NotStarted → InProgress → Completed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress(ActiveSession),
    Completed(FinishedSession),
}

impl SessionState {
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::NotStarted => SessionStatus::NotStarted,
            SessionState::InProgress(_) => SessionStatus::InProgress,
            SessionState::Completed(_) => SessionStatus::Completed,
        }
    }

    #[must_use]
    pub fn assessment_id(&self) -> Option<AssessmentId> {
        match self {
            SessionState::NotStarted => None,
            SessionState::InProgress(active) => Some(active.assessment_id()),
            SessionState::Completed(finished) => Some(finished.assessment_id()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
