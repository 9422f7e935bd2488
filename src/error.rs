use thiserror::Error;

use crate::onboard::OnboardError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Onboard(#[from] OnboardError),
}

pub type Result<T> = std::result::Result<T, AppError>;
