mod detail;
mod wire;

use std::env;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use assess_core::model::{
    AssessmentId, AssessmentKind, AssessmentResult, QuestionId, SessionSummary, UserId,
};

use crate::api::{
    ApiError, AssessmentApi, AudioUpload, AudioUploadOutcome, ImageUpload, NextOutcome,
    RespondOutcome, ResponseSubmission, StartedAssessment, WritingUploadOutcome,
};
use wire::{
    AudioUploadWire, NextWire, RespondBody, RespondWire, SessionSummaryWire, StartBody, StartWire,
    WritingUploadWire,
};

/// Connection settings for the assessment service.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Read configuration from `ASSESS_API_BASE_URL` / `ASSESS_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("ASSESS_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let bearer_token = env::var("ASSESS_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self {
            base_url,
            bearer_token,
        })
    }
}

/// HTTP adapter for the assessment service's session endpoints.
///
/// Mutating calls are sent exactly once; nothing here retries, so a caller
/// keeps full control over whether a failed submission is re-attempted.
#[derive(Clone)]
pub struct HttpAssessmentClient {
    http: Client,
    config: ClientConfig,
}

impl HttpAssessmentClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/assessment{path}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = detail::normalize_error_body(&body, status.as_u16());
            warn!(status = status.as_u16(), %message, "assessment service call failed");
            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(message));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AssessmentApi for HttpAssessmentClient {
    async fn start(&self, kind: AssessmentKind) -> Result<StartedAssessment, ApiError> {
        debug!(kind = %kind, "starting assessment");
        let request = self.http.post(self.endpoint("/start")).json(&StartBody {
            assessment_type: kind.as_str(),
        });
        let wire: StartWire = self.execute(request).await?;
        wire.into_started()
    }

    async fn respond(
        &self,
        assessment_id: AssessmentId,
        submission: ResponseSubmission,
    ) -> Result<RespondOutcome, ApiError> {
        debug!(%assessment_id, question_id = %submission.question_id, "submitting response");
        let request = self
            .http
            .post(self.endpoint(&format!("/{assessment_id}/respond")))
            .json(&RespondBody::from_submission(&submission));
        let wire: RespondWire = self.execute(request).await?;
        wire.into_outcome()
    }

    async fn next_question(&self, assessment_id: AssessmentId) -> Result<NextOutcome, ApiError> {
        let request = self
            .http
            .get(self.endpoint(&format!("/{assessment_id}/next")));
        let wire: NextWire = self.execute(request).await?;
        wire.into_outcome()
    }

    async fn upload_audio(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        audio: AudioUpload,
    ) -> Result<AudioUploadOutcome, ApiError> {
        debug!(%assessment_id, %question_id, bytes = audio.bytes.len(), "uploading audio response");
        let part = Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.media_type)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid audio media type: {e}")))?;
        let form = Form::new().part("audio_file", part);
        let request = self
            .http
            .post(self.endpoint(&format!("/{assessment_id}/upload-audio")))
            .query(&[("question_id", question_id.value())])
            .multipart(form);
        let wire: AudioUploadWire = self.execute(request).await?;
        Ok(wire.into_outcome())
    }

    async fn upload_writing(
        &self,
        assessment_id: AssessmentId,
        question_id: QuestionId,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<WritingUploadOutcome, ApiError> {
        debug!(%assessment_id, %question_id, has_image = image.is_some(), "uploading writing response");
        let mut request = self
            .http
            .post(self.endpoint(&format!("/{assessment_id}/upload-writing")))
            .query(&[("question_id", question_id.value())]);
        if let Some(text) = &text {
            request = request.query(&[("text", text)]);
        }

        let mut form = Form::new();
        if let Some(image) = image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.media_type)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid image media type: {e}")))?;
            form = form.part("image_file", part);
        }
        let wire: WritingUploadWire = self.execute(request.multipart(form)).await?;
        Ok(wire.into_outcome())
    }

    async fn submit(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError> {
        debug!(%assessment_id, "finalizing assessment");
        let request = self
            .http
            .post(self.endpoint(&format!("/{assessment_id}/submit")));
        self.execute(request).await
    }

    async fn result(&self, assessment_id: AssessmentId) -> Result<AssessmentResult, ApiError> {
        let request = self
            .http
            .get(self.endpoint(&format!("/{assessment_id}/result")));
        self.execute(request).await
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<SessionSummary>, ApiError> {
        let request = self
            .http
            .get(self.endpoint(&format!("/user/{user_id}/assessments")));
        let rows: Vec<SessionSummaryWire> = self.execute(request).await?;
        rows.into_iter()
            .map(SessionSummaryWire::into_summary)
            .collect()
    }
}
