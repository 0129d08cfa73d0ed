mod ids;
mod question;
mod response;
mod result;
mod session;

pub use ids::{AssessmentId, AttemptKey, ParseIdError, QuestionId, ResponseId, UserId};
pub use question::{AssessmentKind, KindError, Question, QuestionError, QuestionKind};
pub use response::{RecordedResponse, SubmitTrigger};
pub use result::{AssessmentResult, SubScore};
pub use session::{ParseStatusError, Progress, ProgressError, SessionStatus, SessionSummary};
