pub mod config;
pub mod logging;

pub mod engine;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod job;
pub mod notifier;
pub mod retry;
pub mod store;
pub mod validate;

pub use engine::{AddRequest, QueueEngine};
pub use error::EngineError;
pub use job::{JobId, JobRecord, JobStatus, ListKind, QueueSnapshot};
pub use notifier::{QueueEvent, QueueObserver};
