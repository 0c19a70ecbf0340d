use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("no catalog entry matches query '{query}'")]
    NotFound { query: String },

    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter { name: &'static str, value: String, reason: String },

    #[error("invalid catalog record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("artifact missing or unreadable at {path}: {reason}")]
    ArtifactMissing { path: PathBuf, reason: String },

    #[error("artifact at {path} has schema version {found}, expected {expected}")]
    VersionMismatch { path: PathBuf, found: u32, expected: u32 },

    #[error("corrupt artifact at {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter { name, value: value.to_string(), reason: reason.into() }
    }
}
