//! Shared error types for the services crate.

use thiserror::Error;

use assess_core::model::ProgressError;
use client::ApiError;

use crate::adapter::AdapterError;

/// Errors emitted when starting a session.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum StartError {
    #[error(transparent)]
    Service(#[from] ApiError),
}

/// Errors emitted by the dedicated upload submission paths.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum UploadError {
    #[error("audio upload failed: {0}")]
    Audio(ApiError),
    #[error("writing upload failed: {0}")]
    Writing(ApiError),
}

/// Errors emitted when submitting a response.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("no assessment session is active")]
    NoSession,
    #[error("the session is already completed")]
    SessionCompleted,
    #[error("no question is open for answering")]
    NoOpenQuestion,
    #[error("another submission is already in flight")]
    InFlight,
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Service(#[from] ApiError),
}

/// Errors emitted when fetching the next question after an accepted response.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum FetchNextError {
    #[error("no assessment session is active")]
    NoSession,
    #[error("no accepted response is awaiting a next question")]
    NotPending,
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Service(#[from] ApiError),
}

/// Errors emitted when reading a finalized result.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("assessment result not found: {0}")]
    NotFound(String),
    #[error("assessment is not completed yet: {0}")]
    NotReady(String),
    #[error(transparent)]
    Service(#[from] ApiError),
}
