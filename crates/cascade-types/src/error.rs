use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Numeric fault: {0}")]
    NumericFault(String),

    #[error("Restart mismatch on '{field}': checkpoint has {stored}, run requests {requested}")]
    RestartMismatch {
        field: String,
        stored: String,
        requested: String,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CascadeResult<T> = Result<T, CascadeError>;
