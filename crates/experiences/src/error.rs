use std::path::PathBuf;

/// Failures surfaced by the retrieval core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed search input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// A raw experiences file could not be read at all.
    #[error("failed to read experiences from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The raw file was readable but held no usable experience blocks.
    #[error("no experiences found for {person}")]
    NoExperiences { person: String },

    #[error("corrupt shard {path}: {reason}")]
    CorruptShard { path: PathBuf, reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("person name {0:?} does not produce a usable shard name")]
    InvalidPerson(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Self::EmbeddingUnavailable(err.to_string())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
