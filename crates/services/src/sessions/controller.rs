use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use assess_core::Clock;
use assess_core::model::{
    AssessmentId, AssessmentKind, AssessmentResult, Progress, Question, QuestionId,
    RecordedResponse, SessionStatus, SubmitTrigger,
};
use client::{ApiError, AssessmentApi, NextOutcome, RespondNext};

use super::state::{ActiveSession, FinishedSession, OpenQuestion, SessionState};
use crate::adapter::{self, CapturedAnswer, SubmissionPlan};
use crate::error::{FetchNextError, ResultError, StartError, SubmissionError, UploadError};
use crate::supervisor::TimeoutSupervisor;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What the session shows after a successful start.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedSession {
    pub question: Question,
    pub progress: Progress,
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The response was accepted and the next question is presented.
    Advanced {
        question: Question,
        progress: Progress,
    },
    /// The session reached its end; the result is retained by the controller.
    Completed { result: AssessmentResult },
    /// The response was accepted, but the follow-up fetch failed.
    /// `fetch_next` retries the fetch alone, without re-submitting.
    AcceptedPendingNext { error: FetchNextError },
    /// Dropped without effect: another submission was already in flight, or
    /// the outcome arrived for a session that has since been replaced.
    Ignored,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one placement assessment session against the service.
///
/// Owns the session state machine, the per-question countdown, and the single
/// submission path that manual submits and timeout fires both funnel through.
/// Exactly one session is active per controller; starting a new one replaces
/// the old only once the service has confirmed it.
pub struct SessionController {
    api: Arc<dyn AssessmentApi>,
    clock: Clock,
    supervisor: TimeoutSupervisor,
    state: SessionState,
    in_flight: bool,
}

impl SessionController {
    #[must_use]
    pub fn new(api: Arc<dyn AssessmentApi>) -> Self {
        Self {
            api,
            clock: Clock::default_clock(),
            supervisor: TimeoutSupervisor::new(),
            state: SessionState::default(),
            in_flight: false,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Mutable access to the clock, for deterministic tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    // ─── read accessors ────────────────────────────────────────────────────

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    #[must_use]
    pub fn assessment_id(&self) -> Option<AssessmentId> {
        self.state.assessment_id()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::InProgress(active) => active.open().map(OpenQuestion::question),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        match &self.state {
            SessionState::NotStarted => None,
            SessionState::InProgress(active) => Some(active.progress()),
            SessionState::Completed(finished) => Some(finished.progress()),
        }
    }

    #[must_use]
    pub fn responses(&self) -> &[RecordedResponse] {
        match &self.state {
            SessionState::NotStarted => &[],
            SessionState::InProgress(active) => active.responses(),
            SessionState::Completed(finished) => finished.responses(),
        }
    }

    /// The retained result once the session completed.
    #[must_use]
    pub fn result_payload(&self) -> Option<&AssessmentResult> {
        match &self.state {
            SessionState::Completed(finished) => Some(finished.result()),
            _ => None,
        }
    }

    /// True between an accepted response and the next question's arrival.
    #[must_use]
    pub fn awaiting_next(&self) -> bool {
        matches!(&self.state, SessionState::InProgress(active) if active.awaiting_next())
    }

    /// Whole seconds left on the open question's answer window.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<i64> {
        self.supervisor.remaining_secs(self.clock.now())
    }

    // ─── operations ────────────────────────────────────────────────────────

    /// Start a session of the given kind, presenting its first question.
    ///
    /// Local state is replaced only after the service confirms the new
    /// session, so a failed start leaves any previous session untouched.
    ///
    /// # Errors
    ///
    /// Returns `StartError` when the service is unreachable or rejects the
    /// kind.
    pub async fn start(&mut self, kind: AssessmentKind) -> Result<StartedSession, StartError> {
        let started = self.api.start(kind).await?;
        let now = self.clock.now();
        debug!(
            assessment_id = %started.assessment_id,
            kind = %kind,
            total = started.progress.total(),
            "assessment session started"
        );

        self.supervisor = TimeoutSupervisor::new();
        self.supervisor.arm(started.question.id(), now);
        self.in_flight = false;
        self.state = SessionState::InProgress(ActiveSession::new(
            started.assessment_id,
            kind,
            started.question.clone(),
            started.progress,
            now,
        ));

        Ok(StartedSession {
            question: started.question,
            progress: started.progress,
        })
    }

    /// Submit the user's answer for the open question.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` when no question is open or the service
    /// call fails; on failure local state is unchanged and the same answer
    /// can be resubmitted.
    pub async fn submit(
        &mut self,
        answer: CapturedAnswer,
    ) -> Result<SubmitOutcome, SubmissionError> {
        self.submit_with_trigger(answer, SubmitTrigger::Manual).await
    }

    /// Cooperative once-per-second tick driving the countdown.
    ///
    /// When the open question's window closes this auto-submits the empty
    /// answer for its modality through the same path as a manual submit.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` when the timeout-triggered submission
    /// fails, exactly as a manual submission would.
    pub async fn tick(&mut self) -> Result<Option<SubmitOutcome>, SubmissionError> {
        if self.in_flight {
            return Ok(None);
        }
        let now = self.clock.now();
        let Some(expiry) = self.supervisor.tick(now) else {
            return Ok(None);
        };
        let Some(kind) = self
            .current_question()
            .filter(|question| question.id() == expiry.question_id)
            .map(Question::kind)
        else {
            // countdown outlived its question; nothing to submit
            return Ok(None);
        };

        warn!(
            question_id = %expiry.question_id,
            elapsed_secs = expiry.elapsed_secs,
            "question timed out, auto-submitting"
        );
        self.submit_with_trigger(CapturedAnswer::empty_for(kind), SubmitTrigger::Timeout)
            .await
            .map(Some)
    }

    /// Retry the advance step after an accepted response whose follow-up
    /// fetch failed. Never re-submits the answer.
    ///
    /// # Errors
    ///
    /// Returns `FetchNextError` when no fetch is pending or the fetch fails
    /// again.
    pub async fn fetch_next(&mut self) -> Result<SubmitOutcome, FetchNextError> {
        if self.in_flight {
            return Ok(SubmitOutcome::Ignored);
        }
        let assessment_id = match &self.state {
            SessionState::NotStarted => return Err(FetchNextError::NoSession),
            SessionState::Completed(_) => return Err(FetchNextError::NotPending),
            SessionState::InProgress(active) => {
                if !active.awaiting_next() {
                    return Err(FetchNextError::NotPending);
                }
                active.assessment_id()
            }
        };

        self.in_flight = true;
        let outcome = self.advance(assessment_id).await;
        self.in_flight = false;

        match outcome {
            SubmitOutcome::AcceptedPendingNext { error } => Err(error),
            other => Ok(other),
        }
    }

    /// Explicitly finalize the session when the server does not auto-complete.
    ///
    /// Calling it again after completion returns the retained result.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` when no session is active or the service
    /// call fails.
    pub async fn finalize(&mut self) -> Result<AssessmentResult, SubmissionError> {
        if self.in_flight {
            return Err(SubmissionError::InFlight);
        }
        let assessment_id = match &self.state {
            SessionState::NotStarted => return Err(SubmissionError::NoSession),
            SessionState::Completed(finished) => return Ok(finished.result().clone()),
            SessionState::InProgress(active) => active.assessment_id(),
        };

        self.in_flight = true;
        let result = self.api.submit(assessment_id).await;
        self.in_flight = false;
        let result = result?;

        if self.is_current(assessment_id) {
            let now = self.clock.now();
            self.complete(result.clone(), now);
        }
        Ok(result)
    }

    /// Fetch the finalized result of any session. Read-only and retry-safe.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::NotFound` for an unknown session and
    /// `ResultError::NotReady` while it is still in progress.
    pub async fn result(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ResultError> {
        match self.api.result(assessment_id).await {
            Ok(result) => Ok(result),
            Err(ApiError::NotFound(message)) => Err(ResultError::NotFound(message)),
            Err(ApiError::Status {
                status: 400,
                message,
            }) => Err(ResultError::NotReady(message)),
            Err(e) => Err(ResultError::Service(e)),
        }
    }

    /// Unconditionally drop all session state and stop the countdown.
    pub fn reset(&mut self) {
        debug!("session reset");
        self.state = SessionState::NotStarted;
        self.supervisor = TimeoutSupervisor::new();
        self.in_flight = false;
    }

    // ─── submission path ───────────────────────────────────────────────────

    async fn submit_with_trigger(
        &mut self,
        answer: CapturedAnswer,
        trigger: SubmitTrigger,
    ) -> Result<SubmitOutcome, SubmissionError> {
        if self.in_flight {
            debug!("submission already in flight, dropping duplicate trigger");
            return Ok(SubmitOutcome::Ignored);
        }

        let (assessment_id, open) = match &self.state {
            SessionState::NotStarted => return Err(SubmissionError::NoSession),
            SessionState::Completed(_) => return Err(SubmissionError::SessionCompleted),
            SessionState::InProgress(active) => match active.open() {
                Some(open) => (active.assessment_id(), open.clone()),
                None => return Err(SubmissionError::NoOpenQuestion),
            },
        };

        let response_time_secs = self.clock.elapsed_secs(open.presented_at());
        let plan = adapter::normalize(open.question(), answer, open.attempt_key(), response_time_secs)?;

        self.in_flight = true;
        let outcome = self
            .dispatch(assessment_id, open.question().id(), plan, trigger, response_time_secs)
            .await;
        self.in_flight = false;
        outcome
    }

    async fn dispatch(
        &mut self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        plan: SubmissionPlan,
        trigger: SubmitTrigger,
        response_time_secs: f64,
    ) -> Result<SubmitOutcome, SubmissionError> {
        match plan {
            SubmissionPlan::Respond(submission) => {
                let text = submission.response_text.clone();
                let outcome = self.api.respond(assessment_id, submission).await?;
                if !self.is_current(assessment_id) {
                    warn!(%assessment_id, "discarding response outcome for a replaced session");
                    return Ok(SubmitOutcome::Ignored);
                }

                let now = self.clock.now();
                let mut response =
                    RecordedResponse::new(question_id, trigger, response_time_secs, now)
                        .with_response_id(outcome.response_id)
                        .with_correctness(outcome.is_correct);
                if let Some(text) = text {
                    response = response.with_text(text);
                }
                if let Some(feedback) = outcome.feedback {
                    response = response.with_feedback(feedback);
                }
                self.accept_response(response);

                match outcome.next {
                    RespondNext::Completed(result) => {
                        self.complete(result.clone(), now);
                        Ok(SubmitOutcome::Completed { result })
                    }
                    RespondNext::QuestionAvailable => Ok(self.advance(assessment_id).await),
                }
            }
            SubmissionPlan::UploadAudio { recording } => {
                let outcome = self
                    .api
                    .upload_audio(assessment_id, question_id, recording)
                    .await
                    .map_err(UploadError::Audio)?;
                if !self.is_current(assessment_id) {
                    warn!(%assessment_id, "discarding audio outcome for a replaced session");
                    return Ok(SubmitOutcome::Ignored);
                }

                let now = self.clock.now();
                let response = RecordedResponse::new(question_id, trigger, response_time_secs, now)
                    .with_response_id(outcome.response_id)
                    .with_text(outcome.transcript);
                self.accept_response(response);
                Ok(self.advance(assessment_id).await)
            }
            SubmissionPlan::UploadWriting { text, image } => {
                let outcome = self
                    .api
                    .upload_writing(assessment_id, question_id, text, Some(image))
                    .await
                    .map_err(UploadError::Writing)?;
                if !self.is_current(assessment_id) {
                    warn!(%assessment_id, "discarding writing outcome for a replaced session");
                    return Ok(SubmitOutcome::Ignored);
                }

                let now = self.clock.now();
                let response = RecordedResponse::new(question_id, trigger, response_time_secs, now)
                    .with_response_id(outcome.response_id)
                    .with_text(outcome.text);
                self.accept_response(response);
                Ok(self.advance(assessment_id).await)
            }
        }
    }

    /// Fetch the next question or completion after an accepted response.
    ///
    /// Fetch failures are folded into `AcceptedPendingNext` so the accepted
    /// response is never lost and only the fetch needs retrying.
    async fn advance(&mut self, assessment_id: AssessmentId) -> SubmitOutcome {
        match self.api.next_question(assessment_id).await {
            Err(e) => {
                let error = FetchNextError::from(e);
                warn!(%assessment_id, %error, "fetching next question failed; response already accepted");
                SubmitOutcome::AcceptedPendingNext { error }
            }
            Ok(outcome) => {
                if !self.is_current(assessment_id) {
                    warn!(%assessment_id, "discarding next question for a replaced session");
                    return SubmitOutcome::Ignored;
                }
                let now = self.clock.now();
                match outcome {
                    NextOutcome::Completed(result) => {
                        self.complete(result.clone(), now);
                        SubmitOutcome::Completed { result }
                    }
                    NextOutcome::Question { question, progress } => {
                        match self.present(question.clone(), progress, now) {
                            Ok(()) => SubmitOutcome::Advanced { question, progress },
                            Err(error) => SubmitOutcome::AcceptedPendingNext { error },
                        }
                    }
                }
            }
        }
    }

    /// Record an accepted response: stop the countdown, close the question,
    /// append to history.
    fn accept_response(&mut self, response: RecordedResponse) {
        if let SessionState::InProgress(active) = &mut self.state {
            self.supervisor.disarm();
            active.close_question();
            debug!(
                question_id = %response.question_id,
                trigger = ?response.trigger,
                "response recorded"
            );
            active.record(response);
        }
    }

    fn present(
        &mut self,
        question: Question,
        progress: Progress,
        now: DateTime<Utc>,
    ) -> Result<(), FetchNextError> {
        if let SessionState::InProgress(active) = &mut self.state {
            let question_id = question.id();
            active.present(question, progress, now)?;
            self.supervisor.arm(question_id, now);
            debug!(%question_id, %progress, "next question presented");
        }
        Ok(())
    }

    /// Converge both completion paths (respond and next) into the terminal
    /// state: question cleared, progress at total, result retained.
    fn complete(&mut self, result: AssessmentResult, now: DateTime<Utc>) {
        self.supervisor.disarm();
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            SessionState::InProgress(active) => {
                debug!(
                    assessment_id = %active.assessment_id(),
                    cefr_level = %result.cefr_level,
                    "assessment completed"
                );
                SessionState::Completed(FinishedSession::from_active(active, result, now))
            }
            other => other,
        };
    }

    /// Guard against stale async outcomes: true only while the given session
    /// is still the live one.
    fn is_current(&self, assessment_id: AssessmentId) -> bool {
        matches!(&self.state, SessionState::InProgress(active) if active.assessment_id() == assessment_id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{QuestionId, QuestionKind};
    use assess_core::time::fixed_clock;
    use client::InMemoryAssessmentService;

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            QuestionKind::MultipleChoice,
            format!("Question {id}"),
            None,
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap()
    }

    fn build_controller(questions: u64) -> SessionController {
        let script = (1..=questions).map(build_question).collect();
        let service = InMemoryAssessmentService::new(
            script,
            AssessmentResult {
                cefr_level: "B1".to_string(),
                ..AssessmentResult::default()
            },
        );
        SessionController::new(Arc::new(service)).with_clock(fixed_clock())
    }

    #[tokio::test]
    async fn submit_without_session_is_an_error() {
        let mut controller = build_controller(2);
        let err = controller
            .submit(CapturedAnswer::MultipleChoice { selected: Some(0) })
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::NoSession);
    }

    #[tokio::test]
    async fn duplicate_trigger_is_dropped_while_in_flight() {
        let mut controller = build_controller(2);
        controller.start(AssessmentKind::Reading).await.unwrap();

        controller.in_flight = true;
        let outcome = controller
            .submit(CapturedAnswer::MultipleChoice { selected: Some(0) })
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert!(controller.responses().is_empty());

        controller.in_flight = false;
        let outcome = controller
            .submit(CapturedAnswer::MultipleChoice { selected: Some(0) })
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Advanced { .. }));
    }

    #[tokio::test]
    async fn tick_is_inert_while_a_submission_is_in_flight() {
        let mut controller = build_controller(2);
        controller.start(AssessmentKind::Reading).await.unwrap();
        controller
            .clock_mut()
            .advance(chrono::Duration::seconds(121));

        controller.in_flight = true;
        assert_eq!(controller.tick().await.unwrap(), None);
        // the guard kept the countdown armed for the next tick
        assert!(controller.supervisor.is_armed());
    }

    #[tokio::test]
    async fn stale_outcomes_are_only_applied_to_the_live_session() {
        let mut controller = build_controller(2);
        controller.start(AssessmentKind::Reading).await.unwrap();
        let live = controller.assessment_id().unwrap();

        assert!(controller.is_current(live));
        assert!(!controller.is_current(AssessmentId::new(999)));

        controller.reset();
        assert!(!controller.is_current(live));
    }
}
