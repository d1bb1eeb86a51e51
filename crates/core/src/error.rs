use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("missing prerequisite {path:?}: run {upstream} first")]
    MissingPrerequisite { path: PathBuf, upstream: String },
    #[error("corrupt input: {0}")]
    CorruptInput(String),
    #[error("invalid evaluation report: {0}")]
    InvalidReport(String),
    #[error("unknown load policy: {0}")]
    UnknownPolicy(String),
    #[error("other: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub fn missing(path: impl Into<PathBuf>, upstream: impl Into<String>) -> Self {
        Self::MissingPrerequisite {
            path: path.into(),
            upstream: upstream.into(),
        }
    }

    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(self, RagError::MissingPrerequisite { .. })
    }
}

impl From<anyhow::Error> for RagError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
