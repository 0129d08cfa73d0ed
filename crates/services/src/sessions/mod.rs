mod controller;
mod state;

// Public API of the session subsystem.
pub use crate::error::{FetchNextError, StartError, SubmissionError};
pub use controller::{SessionController, StartedSession, SubmitOutcome};
pub use state::{ActiveSession, FinishedSession, OpenQuestion, SessionState};
