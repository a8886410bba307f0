use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Invalid color literal: {0}")]
    InvalidColor(String),

    #[error("BoardError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for BoardError {
    fn from(error: std::io::Error) -> Self {
        BoardError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(error: reqwest::Error) -> Self {
        BoardError::Reqwest(Box::new(error))
    }
}
