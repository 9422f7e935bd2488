use thiserror::Error;

use super::store::StoreError;
use super::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum OnboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Onboarding progress has not been loaded yet")]
    NotReady,

    #[error("Onboarding progress is still loading")]
    Hydrating,

    #[error("Onboarding is already completed")]
    Completed,

    #[error("Field '{0}' is read-only")]
    ReadOnlyField(&'static str),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("No experience at position {0}")]
    NoSuchExperience(usize),
}

pub type Result<T> = std::result::Result<T, OnboardError>;
