use chrono::{DateTime, Utc};
use url::Url;

use crate::model::ids::{QuestionId, ResponseId};

/// What caused a submission: the user, or the per-question countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Record of one answered question, in submission order.
///
/// Created once the service accepts a submission and immutable afterwards;
/// the ordered history of these is the client-side audit of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub question_id: QuestionId,
    pub response_id: Option<ResponseId>,
    pub text: Option<String>,
    pub audio_url: Option<Url>,
    pub response_time_secs: f64,
    pub is_correct: Option<bool>,
    pub feedback: Option<String>,
    pub trigger: SubmitTrigger,
    pub submitted_at: DateTime<Utc>,
}

impl RecordedResponse {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        trigger: SubmitTrigger,
        response_time_secs: f64,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            response_id: None,
            text: None,
            audio_url: None,
            response_time_secs,
            is_correct: None,
            feedback: None,
            trigger,
            submitted_at,
        }
    }

    #[must_use]
    pub fn with_response_id(mut self, response_id: ResponseId) -> Self {
        self.response_id = Some(response_id);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_audio_url(mut self, audio_url: Url) -> Self {
        self.audio_url = Some(audio_url);
        self
    }

    #[must_use]
    pub fn with_correctness(mut self, is_correct: Option<bool>) -> Self {
        self.is_correct = is_correct;
        self
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn builder_fills_optional_fields() {
        let response = RecordedResponse::new(
            QuestionId::new(9),
            SubmitTrigger::Manual,
            12.5,
            fixed_now(),
        )
        .with_response_id(ResponseId::new(1))
        .with_text("fast")
        .with_correctness(Some(true))
        .with_feedback("Correct!");

        assert_eq!(response.question_id, QuestionId::new(9));
        assert_eq!(response.response_id, Some(ResponseId::new(1)));
        assert_eq!(response.text.as_deref(), Some("fast"));
        assert_eq!(response.is_correct, Some(true));
        assert_eq!(response.trigger, SubmitTrigger::Manual);
        assert!(response.audio_url.is_none());
    }
}
