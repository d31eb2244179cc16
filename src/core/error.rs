use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourtError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid map: {0}")]
    InvalidMap(String),

    #[error("Dialogue backend error: {0}")]
    DialogueError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, CourtError>;
