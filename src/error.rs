use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by rule loading, record loading, mapping and persistence.
///
/// A single enum is shared across the whole pipeline so per-source and per-record failures can be
/// reported to the same observer.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON could not be parsed or serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The rule document is not usable (not an object, empty source path, ...).
    #[error("invalid rules: {message}")]
    InvalidRules { message: String },

    /// No rule resolved against the record.
    #[error("no matching fields found")]
    NoMatchingFields,

    /// A mapped record carries sign-in activity but no string `id` to reference it by.
    #[error("sign-in activity skipped: record has no string '{key}' field")]
    MissingUserId { key: String },

    /// The payload is neither an object nor an array of objects.
    #[error(
        "expected structure not found in json; ensure the input matches the rules structure (json keys detected: {keys:?})"
    )]
    UnexpectedStructure { keys: Vec<String> },

    /// A directory glob pattern could not be built.
    #[error("invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// The worker pool could not be started.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
