//! Error taxonomy for the queue engine and its collaborators.

use thiserror::Error;

/// Metadata resolution failed. Surfaced to callers of `add` / `resolve_info`.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("unsupported or unrecognized URL: {0}")]
    Unsupported(String),

    #[error("media unavailable: {0}")]
    Unavailable(String),

    #[error("extractor could not run: {0}")]
    Tool(String),

    #[error("metadata resolution timed out after {0}s")]
    Timeout(u64),

    #[error("invalid extractor output: {0}")]
    InvalidOutput(String),
}

/// A fetch failed while a job was downloading. Recorded on the job as `last_error`.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("download canceled")]
    Canceled,

    #[error("extractor could not run: {0}")]
    Tool(String),

    #[error("{0}")]
    Failed(String),

    #[error("download worker crashed: {0}")]
    WorkerCrashed(String),
}

/// The state store could not be read or written. Logged; the engine keeps running.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("state store: {0}")]
    Database(#[from] sqlx::Error),

    #[error("state store io: {0}")]
    Io(#[from] std::io::Error),
}

/// An executor could not be started for an admitted job.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("cannot prepare destination {path}: {source}")]
    Destination {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("destination folder does not exist: {0}")]
    MissingFolder(String),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrent_downloads must be at least 1 in limited mode")]
    ZeroConcurrency,

    #[error("output template `{0}` must not be empty")]
    EmptyTemplate(&'static str),

    #[error("retry.base_delay_secs must be between 0 and {max}, got {value}")]
    InvalidRetryDelay { value: String, max: u64 },
}

/// Errors returned synchronously to callers of the engine handle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown list selector: {0}")]
    UnknownList(String),

    #[error(transparent)]
    Store(#[from] PersistenceError),

    #[error("queue engine is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, EngineError>;
