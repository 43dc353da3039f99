use thiserror::Error;

/// Error taxonomy shared by the tag store, the orchestrator and the routes.
#[derive(Debug, Error)]
pub enum TaggerError {
    /// Missing file, directory or lookup target.
    #[error("not found: {0}")]
    NotFound(String),

    /// Loading, decoding or scoring a single image failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Store read or write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Invalid job or service parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for TaggerError {
    fn from(e: sqlx::Error) -> Self {
        TaggerError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for TaggerError {
    fn from(e: serde_json::Error) -> Self {
        TaggerError::Persistence(format!("tag encoding: {e}"))
    }
}

pub type TaggerResult<T> = Result<T, TaggerError>;
