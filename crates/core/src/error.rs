use thiserror::Error;

use crate::model::{KindError, ProgressError, QuestionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Kind(#[from] KindError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
