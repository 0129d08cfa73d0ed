#![forbid(unsafe_code)]

pub mod api;
pub mod http;

pub use api::{
    ApiError, AssessmentApi, AudioUpload, AudioUploadOutcome, ImageUpload,
    InMemoryAssessmentService, NextOutcome, RespondNext, RespondOutcome, ResponseSubmission,
    StartedAssessment, WritingUploadOutcome,
};
pub use http::{ClientConfig, HttpAssessmentClient};
