#![forbid(unsafe_code)]

pub mod adapter;
pub mod error;
pub mod sessions;
pub mod supervisor;

pub use assess_core::Clock;

pub use adapter::{AdapterError, CapturedAnswer, NO_RESPONSE_TEXT, SubmissionPlan};
pub use error::{FetchNextError, ResultError, StartError, SubmissionError, UploadError};
pub use sessions::{SessionController, SessionState, StartedSession, SubmitOutcome};
pub use supervisor::{Expiry, QUESTION_TIME_LIMIT_SECS, TimeoutSupervisor};
