use anyhow::Error;
use thiserror::Error;

use crate::{api::ApiError, board::BoardError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Other(#[from] Error),
}

impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}
