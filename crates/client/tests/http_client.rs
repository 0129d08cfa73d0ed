use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assess_core::model::{
    AssessmentId, AssessmentKind, AttemptKey, Progress, QuestionId, QuestionKind, SessionStatus,
    UserId,
};
use client::{
    ApiError, AssessmentApi, AudioUpload, ClientConfig, HttpAssessmentClient, NextOutcome,
    RespondNext, ResponseSubmission,
};

fn client_for(server: &MockServer) -> HttpAssessmentClient {
    HttpAssessmentClient::new(ClientConfig::new(server.uri()))
}

fn submission(question_id: u64, text: &str) -> ResponseSubmission {
    ResponseSubmission {
        question_id: QuestionId::new(question_id),
        attempt_key: AttemptKey::generate(),
        response_time_secs: 11.5,
        response_text: Some(text.to_string()),
        response_audio_url: None,
    }
}

#[tokio::test]
async fn start_parses_question_and_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/start"))
        .and(body_partial_json(serde_json::json!({"assessment_type": "reading"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "assessment_id": 7,
            "question": {
                "id": 41,
                "question_type": "multiple_choice",
                "content": "Choose the best summary.",
                "passage": "The tide rose quickly...",
                "options": ["A", "B", "C", "D"],
                "lexile_level": 860,
                "assessment_category": "reading",
                "difficulty_logit": -0.2
            },
            "progress": {"current": 1, "total": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let started = client_for(&server)
        .start(AssessmentKind::Reading)
        .await
        .unwrap();

    assert_eq!(started.assessment_id, AssessmentId::new(7));
    assert_eq!(started.question.id(), QuestionId::new(41));
    assert_eq!(started.question.kind(), QuestionKind::MultipleChoice);
    assert_eq!(started.question.passage(), Some("The tide rose quickly..."));
    assert_eq!(started.progress, Progress::new(1, 15).unwrap());
}

#[tokio::test]
async fn bearer_token_is_attached_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/3/result"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"cefr_level": "B2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_bearer_token("secret-token");
    let result = HttpAssessmentClient::new(config)
        .result(AssessmentId::new(3))
        .await
        .unwrap();
    assert_eq!(result.cefr_level, "B2");
}

#[tokio::test]
async fn respond_reports_next_question_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/7/respond"))
        .and(body_partial_json(
            serde_json::json!({"question_id": 41, "response_text": "B", "response_time": 11.5}),
        ))
        .and(body_string_contains("attempt_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response_id": 900,
            "is_correct": true,
            "feedback": "",
            "next_question_available": true,
            "completed": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .respond(AssessmentId::new(7), submission(41, "B"))
        .await
        .unwrap();

    assert_eq!(outcome.is_correct, Some(true));
    assert_eq!(outcome.feedback, None);
    assert_eq!(outcome.next, RespondNext::QuestionAvailable);
}

#[tokio::test]
async fn respond_reports_completion_with_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/7/respond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response_id": 915,
            "is_correct": false,
            "feedback": "",
            "next_question_available": false,
            "completed": true,
            "result": {
                "assessment_id": 7,
                "cefr_level": "B1",
                "raw_score": 0.6,
                "theta_score": 0.1,
                "standard_error": 0.3,
                "sub_scores": [],
                "feedback": "Your CEFR level is B1.",
                "recommendations": []
            }
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .respond(AssessmentId::new(7), submission(55, "A"))
        .await
        .unwrap();

    let RespondNext::Completed(result) = outcome.next else {
        panic!("expected completion");
    };
    assert_eq!(result.cefr_level, "B1");
    assert_eq!(result.assessment_id, Some(AssessmentId::new(7)));
}

#[tokio::test]
async fn next_returns_question_then_completion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/7/next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "question": {
                "id": 42,
                "question_type": "writing",
                "content": "Describe your favourite place."
            },
            "progress": {"current": 2, "total": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let next = client_for(&server)
        .next_question(AssessmentId::new(7))
        .await
        .unwrap();
    let NextOutcome::Question { question, progress } = next else {
        panic!("expected a question");
    };
    assert_eq!(question.kind(), QuestionKind::Writing);
    assert_eq!(progress, Progress::new(2, 15).unwrap());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/7/next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "completed": true,
            "result": {"cefr_level": "A2"}
        })))
        .mount(&server)
        .await;

    let next = client_for(&server)
        .next_question(AssessmentId::new(7))
        .await
        .unwrap();
    assert!(matches!(next, NextOutcome::Completed(result) if result.cefr_level == "A2"));
}

#[tokio::test]
async fn upload_audio_sends_multipart_with_question_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/7/upload-audio"))
        .and(query_param("question_id", "43"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transcript": "I usually read in the evening",
            "fluency_metrics": {"words_per_minute": 104.0},
            "ai_scores": {"overall_score": 3.5},
            "response_id": 77
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .upload_audio(
            AssessmentId::new(7),
            QuestionId::new(43),
            AudioUpload {
                file_name: "answer.webm".to_string(),
                media_type: "audio/webm".to_string(),
                bytes: vec![1, 2, 3, 4],
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.transcript, "I usually read in the evening");
    assert_eq!(outcome.response_id.value(), 77);
}

#[tokio::test]
async fn string_detail_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/99/result"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"detail": "Assessment not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .result(AssessmentId::new(99))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound("Assessment not found".to_string()));
}

#[tokio::test]
async fn validation_list_detail_is_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/7/respond"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "detail": [
                {"loc": ["body", "response_time"], "msg": "field required", "type": "value_error"}
            ]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .respond(AssessmentId::new(7), submission(41, "B"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 422,
            message: "field required".to_string()
        }
    );
}

#[tokio::test]
async fn object_detail_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assessment/7/upload-writing"))
        .and(query_param("question_id", "44"))
        .and(query_param("text", "my essay"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "detail": {"error": "Writing processing failed: empty image"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_writing(
            AssessmentId::new(7),
            QuestionId::new(44),
            Some("my essay".to_string()),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 400,
            message: "Writing processing failed: empty image".to_string()
        }
    );
}

#[tokio::test]
async fn list_sessions_maps_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/assessment/user/5/assessments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": 1,
                "assessment_type": "reading",
                "status": "completed",
                "cefr_level": "B1",
                "lexile_estimate": 880,
                "theta_score": 0.3,
                "started_at": "2024-05-01T10:00:00Z",
                "completed_at": "2024-05-01T10:25:00Z"
            },
            {
                "id": 2,
                "assessment_type": "speaking",
                "status": "in_progress",
                "cefr_level": null,
                "started_at": "2024-05-02T09:00:00Z",
                "completed_at": null
            }
        ])))
        .mount(&server)
        .await;

    let rows = client_for(&server)
        .list_sessions(UserId::new(5))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status, SessionStatus::Completed);
    assert_eq!(rows[0].cefr_level.as_deref(), Some("B1"));
    assert_eq!(rows[1].kind, AssessmentKind::Speaking);
    assert_eq!(rows[1].status, SessionStatus::InProgress);
}
