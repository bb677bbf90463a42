//! Job records and the selectors used to address the three job lists.

mod record;
mod types;

pub(crate) use record::unix_timestamp;
pub use record::{JobRecord, QueueSnapshot};
pub use types::{JobId, JobStatus, ListKind};
