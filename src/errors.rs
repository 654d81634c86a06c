use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("SCHEMA_UNAVAILABLE: {0}")]
    SchemaUnavailable(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("STORAGE_FAILURE: {0}")]
    Storage(String),
    #[error("INVALID_VALUE: {0}")]
    InvalidValue(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Io(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
