use stickwork_core::TimingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PracticeError>;

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("Invalid practice config JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("Invalid practice config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Timing(#[from] TimingError),
}
