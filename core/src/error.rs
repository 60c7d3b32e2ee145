use thiserror::Error;

/// Errors raised by codecs, snapshot import and the parallel builder.
///
/// Maintenance operations never return these: unknown ids and unknown terms
/// are ordinary empty outcomes.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("truncated data while decoding {context}")]
    TruncatedData { context: &'static str },

    #[error("incompatible snapshot version {actual}, expected <= {expected}")]
    IncompatibleSnapshot { expected: u32, actual: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        IndexError::InvalidInput(msg.into())
    }

    /// True for failures caused by input that ended mid-encoding.
    pub fn is_truncation(&self) -> bool {
        matches!(self, IndexError::TruncatedData { .. })
    }
}
