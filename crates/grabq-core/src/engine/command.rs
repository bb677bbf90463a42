//! Messages processed by the engine actor.

use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::error::SchedulingError;
use crate::job::{JobId, JobRecord, ListKind, QueueSnapshot};
use crate::store::PersistAck;

/// Public requests, sent by `QueueEngine` handles.
pub(super) enum Command {
    Add {
        record: JobRecord,
        reply: oneshot::Sender<(JobRecord, PersistAck)>,
    },
    List {
        kind: ListKind,
        reply: oneshot::Sender<Vec<JobRecord>>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    Delete {
        ids: Vec<JobId>,
        from: ListKind,
        reply: oneshot::Sender<PersistAck>,
    },
    Start {
        ids: Vec<JobId>,
        reply: oneshot::Sender<PersistAck>,
    },
    ClearCompleted {
        reply: oneshot::Sender<PersistAck>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Messages the actor sends itself from helper tasks.
pub(super) enum Internal {
    /// Executors of a deletion have exited; the records can go.
    DeleteReady {
        ids: Vec<JobId>,
        from: ListKind,
        stopped: usize,
    },
    /// Destination of an admitted job is ready (or could not be prepared).
    Prepared {
        id: JobId,
        result: Result<PathBuf, SchedulingError>,
    },
    /// Lazily resolved metadata for a job added without it.
    Title {
        id: JobId,
        title: String,
        playlist: bool,
    },
    /// A spawn backoff elapsed; run admission again.
    Rescan,
}
