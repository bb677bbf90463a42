//! Background task that persists queue snapshots off the engine's event loop.
//!
//! Requests are coalesced: when several snapshots are waiting, only the newest
//! is written, and every waiting request is acknowledged once that write is done.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::job::QueueSnapshot;

use super::db::StateStore;

/// Resolves once the snapshot it was issued for (or a newer one) has been written.
///
/// A failed write still resolves the ack; the failure is logged by the writer.
pub struct PersistAck(Option<oneshot::Receiver<()>>);

impl PersistAck {
    /// An ack that is already resolved.
    pub fn done() -> Self {
        PersistAck(None)
    }

    pub async fn wait(self) {
        if let Some(rx) = self.0 {
            // A dropped sender means the writer has shut down; nothing left to wait for.
            let _ = rx.await;
        }
    }
}

struct PersistRequest {
    snapshot: QueueSnapshot,
    ack: Option<oneshot::Sender<()>>,
}

/// Handle to the store writer task.
pub struct StoreWriter {
    tx: Option<mpsc::UnboundedSender<PersistRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl StoreWriter {
    /// Spawn the writer task for `store`. Must be called inside a tokio runtime.
    pub fn spawn(store: StateStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer_loop(rx, store));
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queue `snapshot` for writing without waiting.
    pub fn save(&self, snapshot: QueueSnapshot) {
        self.send(PersistRequest {
            snapshot,
            ack: None,
        });
    }

    /// Queue `snapshot` for writing; the returned ack resolves once it is durable.
    pub fn save_acked(&self, snapshot: QueueSnapshot) -> PersistAck {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(PersistRequest {
            snapshot,
            ack: Some(ack_tx),
        });
        PersistAck(Some(ack_rx))
    }

    fn send(&self, request: PersistRequest) {
        let Some(tx) = &self.tx else {
            tracing::warn!("state write after store writer shut down");
            return;
        };
        if tx.send(request).is_err() {
            tracing::error!("store writer task is gone; state change not persisted");
        }
    }

    /// Flush everything queued so far and stop the writer.
    pub async fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("store writer join: {}", e);
            }
        }
    }
}

async fn run_writer_loop(mut rx: mpsc::UnboundedReceiver<PersistRequest>, store: StateStore) {
    while let Some(first) = rx.recv().await {
        let mut latest = first.snapshot;
        let mut acks: Vec<oneshot::Sender<()>> = first.ack.into_iter().collect();
        while let Ok(next) = rx.try_recv() {
            latest = next.snapshot;
            acks.extend(next.ack);
        }

        match store.save(&latest).await {
            Ok(()) => tracing::trace!(jobs = latest.len(), "queue state saved"),
            Err(e) => tracing::error!("failed to save queue state: {}", e),
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }
    store.close().await;
}
