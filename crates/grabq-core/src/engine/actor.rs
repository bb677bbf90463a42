//! The engine actor: sole owner of the job lists and the running executors.
//!
//! Every mutation is a message handled here, one at a time. Persistence goes to
//! the store writer and notifications to the notifier; neither blocks the loop.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::config::GrabqConfig;
use crate::error::{FetchError, SchedulingError};
use crate::executor::{prepare_output_dir, ExecutorEvent, JobExecutor};
use crate::extractor::{Extractor, FetchOutcome, FetchProgress};
use crate::job::{unix_timestamp, JobId, JobRecord, JobStatus, ListKind, QueueSnapshot};
use crate::notifier::{Notifier, QueueEvent};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::store::{PersistAck, StoreWriter};

use super::admission::{self, Eligibility};
use super::command::{Command, Internal};

pub(super) struct Actor {
    config: Arc<GrabqConfig>,
    extractor: Arc<dyn Extractor>,
    lists: QueueSnapshot,
    executors: HashMap<JobId, JobExecutor>,
    /// Admitted jobs whose destination is being prepared; they hold a slot.
    preparing: HashSet<JobId>,
    /// Jobs whose deletion is waiting for their executors to exit.
    deleting: HashSet<JobId>,
    /// Delete replies that wait until none of their jobs is still in `deleting`.
    delete_waiters: Vec<(HashSet<JobId>, oneshot::Sender<PersistAck>)>,
    /// Executors being stopped; they still hold a slot.
    draining: usize,
    /// Failed spawn attempts per job, and when the next one may happen.
    spawn_attempts: HashMap<JobId, (u32, Instant)>,
    retry: RetryPolicy,
    writer: StoreWriter,
    notifier: Notifier,
    exec_tx: mpsc::UnboundedSender<ExecutorEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

pub(super) struct Channels {
    pub commands: mpsc::Receiver<Command>,
    pub exec_rx: mpsc::UnboundedReceiver<ExecutorEvent>,
    pub internal_rx: mpsc::UnboundedReceiver<Internal>,
}

/// Interrupted downloads go back to the queue.
pub(super) fn reset_interrupted(lists: &mut QueueSnapshot) -> usize {
    let mut reset = 0;
    for rec in lists.queued.iter_mut() {
        if rec.status == JobStatus::Downloading {
            rec.status = JobStatus::Queued;
            rec.clear_transfer_labels();
            reset += 1;
        }
    }
    reset
}

fn position(list: &[JobRecord], id: &JobId) -> Option<usize> {
    list.iter().position(|r| r.id == *id)
}

impl Actor {
    pub(super) fn new(
        config: Arc<GrabqConfig>,
        extractor: Arc<dyn Extractor>,
        lists: QueueSnapshot,
        writer: StoreWriter,
        notifier: Notifier,
        commands: mpsc::Receiver<Command>,
    ) -> (Self, Channels) {
        let (exec_tx, exec_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let retry = RetryPolicy::from(&config.retry_config());
        let actor = Self {
            config,
            extractor,
            lists,
            executors: HashMap::new(),
            preparing: HashSet::new(),
            deleting: HashSet::new(),
            delete_waiters: Vec::new(),
            draining: 0,
            spawn_attempts: HashMap::new(),
            retry,
            writer,
            notifier,
            exec_tx,
            internal_tx,
        };
        (
            actor,
            Channels {
                commands,
                exec_rx,
                internal_rx,
            },
        )
    }

    pub(super) async fn run(mut self, mut channels: Channels) {
        self.admit();
        loop {
            tokio::select! {
                cmd = channels.commands.recv() => match cmd {
                    Some(Command::Close { reply }) => {
                        self.shutdown(&mut channels.exec_rx).await;
                        let _ = reply.send(());
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        self.shutdown(&mut channels.exec_rx).await;
                        return;
                    }
                },
                Some(event) = channels.exec_rx.recv() => self.handle_executor_event(event),
                Some(msg) = channels.internal_rx.recv() => self.handle_internal(msg),
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Add { record, reply } => {
                let ack = self.add(record.clone());
                let _ = reply.send((record, ack));
            }
            Command::List { kind, reply } => {
                let _ = reply.send(self.lists.list(kind).to_vec());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.lists.clone());
            }
            Command::Delete { ids, from, reply } => self.delete(ids, from, reply),
            Command::Start { ids, reply } => {
                let ack = self.start(&ids);
                let _ = reply.send(ack);
            }
            Command::ClearCompleted { reply } => {
                let ack = self.clear_completed();
                let _ = reply.send(ack);
            }
            Command::Close { .. } => unreachable!("close is handled by the run loop"),
        }
    }

    fn handle_executor_event(&mut self, event: ExecutorEvent) {
        match event {
            ExecutorEvent::Progress { id, progress } => self.apply_progress(&id, progress),
            ExecutorEvent::Finished { id, result } => self.finish(id, result),
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::DeleteReady { ids, from, stopped } => {
                self.draining = self.draining.saturating_sub(stopped);
                // Acks go to the parked delete replies.
                self.remove_records(&ids, from);
            }
            Internal::Prepared { id, result } => self.prepared(id, result),
            Internal::Title {
                id,
                title,
                playlist,
            } => self.apply_title(&id, title, playlist),
            Internal::Rescan => self.admit(),
        }
    }

    fn persist(&self) {
        self.writer.save(self.lists.clone());
    }

    fn persist_acked(&self) -> PersistAck {
        self.writer.save_acked(self.lists.clone())
    }

    fn add(&mut self, record: JobRecord) -> PersistAck {
        tracing::info!(job_id = %record.id, url = %record.url, status = record.status.as_str(), "job added");
        let kind = record.initial_list();
        self.lists.list_mut(kind).push(record.clone());
        self.notifier.publish(QueueEvent::Added(record));
        if kind == ListKind::Queued {
            self.admit();
        }
        self.persist_acked()
    }

    fn start(&mut self, ids: &[JobId]) -> PersistAck {
        let wanted: HashSet<JobId> = ids.iter().cloned().collect();
        let (moving, staying): (Vec<JobRecord>, Vec<JobRecord>) = std::mem::take(&mut self.lists.pending)
            .into_iter()
            .partition(|r| wanted.contains(&r.id));
        self.lists.pending = staying;
        if moving.is_empty() {
            return PersistAck::done();
        }

        for mut rec in moving {
            rec.status = JobStatus::Queued;
            tracing::info!(job_id = %rec.id, "pending job started");
            if rec.title.is_empty() {
                self.resolve_title_later(&rec);
            }
            self.lists.queued.push(rec.clone());
            self.notifier.publish(QueueEvent::Updated(rec));
        }
        self.admit();
        self.persist_acked()
    }

    fn resolve_title_later(&self, rec: &JobRecord) {
        let extractor = Arc::clone(&self.extractor);
        let internal_tx = self.internal_tx.clone();
        let id = rec.id.clone();
        let url = rec.url.clone();
        tokio::spawn(async move {
            match extractor.resolve(&url).await {
                Ok(info) => {
                    let _ = internal_tx.send(Internal::Title {
                        id,
                        title: info.title,
                        playlist: info.playlist,
                    });
                }
                Err(e) => tracing::warn!(job_id = %id, url = %url, "title lookup failed: {}", e),
            }
        });
    }

    fn apply_title(&mut self, id: &JobId, title: String, playlist: bool) {
        if title.is_empty() {
            return;
        }
        let running = self.executors.contains_key(id);
        let lists = &mut self.lists;
        let Some(rec) = [&mut lists.queued, &mut lists.pending, &mut lists.completed]
            .into_iter()
            .flatten()
            .find(|r| r.id == *id)
        else {
            return;
        };
        rec.title = title;
        // The output template of a running fetch is already fixed.
        if !running {
            rec.playlist = playlist;
        }
        let rec = rec.clone();
        self.notifier.publish(QueueEvent::Updated(rec));
        self.persist();
    }

    fn delete(&mut self, ids: Vec<JobId>, from: ListKind, reply: oneshot::Sender<PersistAck>) {
        let mut seen = HashSet::new();
        let (in_flight, fresh): (Vec<JobId>, Vec<JobId>) = ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .filter(|id| position(self.lists.list(from), id).is_some())
            .partition(|id| self.deleting.contains(id));

        let stopping: Vec<JobExecutor> = fresh
            .iter()
            .filter_map(|id| self.executors.remove(id))
            .collect();
        // Jobs already being stopped by an earlier delete: this reply waits for them too.
        let mut waiting: HashSet<JobId> = in_flight.into_iter().collect();
        if stopping.is_empty() {
            let ack = if fresh.is_empty() {
                PersistAck::done()
            } else {
                self.remove_records(&fresh, from)
            };
            if waiting.is_empty() {
                let _ = reply.send(ack);
                return;
            }
        } else {
            waiting.extend(fresh.iter().cloned());
            self.stop_then_remove(fresh, from, stopping);
        }
        self.delete_waiters.push((waiting, reply));
    }

    fn stop_then_remove(&mut self, ids: Vec<JobId>, from: ListKind, stopping: Vec<JobExecutor>) {
        let stopped = stopping.len();
        tracing::info!(jobs = ids.len(), running = stopped, "stopping downloads before delete");
        self.draining += stopped;
        self.deleting.extend(ids.iter().cloned());
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let mut set = JoinSet::new();
            for exec in stopping {
                set.spawn(exec.stop());
            }
            while set.join_next().await.is_some() {}
            let _ = internal_tx.send(Internal::DeleteReady { ids, from, stopped });
        });
    }

    fn remove_records(&mut self, ids: &[JobId], from: ListKind) -> PersistAck {
        let list = self.lists.list_mut(from);
        let mut removed = Vec::new();
        for id in ids {
            self.deleting.remove(id);
            self.spawn_attempts.remove(id);
            if let Some(pos) = position(list, id) {
                list.remove(pos);
                removed.push(id.clone());
            }
        }
        for id in removed {
            tracing::info!(job_id = %id, list = %from, "job deleted");
            self.notifier.publish(QueueEvent::Canceled(id));
        }
        self.admit();
        self.answer_delete_waiters();
        self.persist_acked()
    }

    fn answer_delete_waiters(&mut self) {
        if self.delete_waiters.is_empty() {
            return;
        }
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.delete_waiters)
            .into_iter()
            .partition(|(ids, _)| ids.iter().all(|id| !self.deleting.contains(id)));
        self.delete_waiters = waiting;
        for (_, reply) in ready {
            let _ = reply.send(self.persist_acked());
        }
    }

    fn clear_completed(&mut self) -> PersistAck {
        let n = self.lists.completed.len();
        self.lists.completed.clear();
        tracing::info!(jobs = n, "completed list cleared");
        self.notifier.publish(QueueEvent::Cleared);
        self.persist_acked()
    }

    fn apply_progress(&mut self, id: &JobId, progress: FetchProgress) {
        if !self.executors.contains_key(id) {
            return;
        }
        let Some(rec) = self.lists.queued.iter_mut().find(|r| r.id == *id) else {
            return;
        };
        rec.downloaded_bytes = progress.downloaded_bytes;
        if let Some(total) = progress.total_bytes {
            rec.total_bytes = total;
        }
        if let Some(fraction) = progress.fraction() {
            rec.progress = rec.progress.max(fraction);
        }
        rec.speed = progress.speed_label;
        rec.eta = progress.eta_label;
        let rec = rec.clone();
        self.notifier.publish(QueueEvent::Updated(rec));
    }

    fn finish(&mut self, id: JobId, result: Result<FetchOutcome, FetchError>) {
        if self.deleting.contains(&id) || self.executors.remove(&id).is_none() {
            return;
        }
        if self.record_result(id, result) {
            self.admit();
            self.persist();
        }
    }

    /// Move a finished job to the completed list. False if it is no longer queued.
    fn record_result(&mut self, id: JobId, result: Result<FetchOutcome, FetchError>) -> bool {
        let Some(pos) = position(&self.lists.queued, &id) else {
            return false;
        };
        let mut rec = self.lists.queued.remove(pos);
        match result {
            Ok(outcome) => {
                rec.status = JobStatus::Completed;
                rec.progress = 1.0;
                rec.destination_path = outcome.final_path.display().to_string();
                rec.last_error.clear();
                tracing::info!(job_id = %id, path = %rec.destination_path, "download completed");
            }
            Err(FetchError::Canceled) => {
                rec.status = JobStatus::Canceled;
                rec.last_error = FetchError::Canceled.to_string();
                tracing::info!(job_id = %id, "download canceled");
            }
            Err(e) => {
                rec.status = JobStatus::Error;
                rec.last_error = e.to_string();
                if rec.last_error.is_empty() {
                    rec.last_error = "download failed".to_string();
                }
                tracing::warn!(job_id = %id, url = %rec.url, "download failed: {}", rec.last_error);
            }
        }
        self.move_to_completed(rec);
        true
    }

    fn move_to_completed(&mut self, mut rec: JobRecord) {
        rec.completed_at = Some(unix_timestamp());
        rec.clear_transfer_labels();
        self.spawn_attempts.remove(&rec.id);
        self.lists.completed.push(rec.clone());
        self.notifier.publish(QueueEvent::Completed(rec));
    }

    /// Claim free slots for queued jobs and prepare their destinations off the loop.
    fn admit(&mut self) {
        let free = admission::free_slots(
            self.config.concurrency_cap(),
            self.executors.len() + self.preparing.len() + self.draining,
        );
        if free == 0 {
            return;
        }

        let executors = &self.executors;
        let preparing = &self.preparing;
        let deleting = &self.deleting;
        let attempts = &self.spawn_attempts;
        let is_busy = |id: &JobId| {
            executors.contains_key(id) || preparing.contains(id) || deleting.contains(id)
        };
        let not_before = |id: &JobId| attempts.get(id).map(|(_, at)| *at);
        let candidates = admission::next_candidates(
            &self.lists.queued,
            &Eligibility {
                is_busy: &is_busy,
                not_before: &not_before,
                now: Instant::now(),
            },
            free,
        );

        for id in candidates {
            let Some(rec) = self.lists.queued.iter().find(|r| r.id == id) else {
                continue;
            };
            let download_dir = self.config.download_dir.clone();
            let folder = rec.folder.clone();
            let create = self.config.create_custom_dirs;
            let internal_tx = self.internal_tx.clone();
            self.preparing.insert(id.clone());
            tokio::spawn(async move {
                let result = prepare_output_dir(&download_dir, folder.as_deref(), create).await;
                let _ = internal_tx.send(Internal::Prepared { id, result });
            });
        }
    }

    fn prepared(&mut self, id: JobId, result: Result<PathBuf, SchedulingError>) {
        if !self.preparing.remove(&id) {
            return;
        }
        // Deleted while its destination was being prepared.
        let Some(pos) = position(&self.lists.queued, &id) else {
            self.admit();
            return;
        };
        match result {
            Ok(output_dir) => self.launch(pos, output_dir),
            Err(e) => self.spawn_failed(pos, e),
        }
        self.admit();
        self.persist();
    }

    fn launch(&mut self, pos: usize, output_dir: PathBuf) {
        let mut exec = JobExecutor::new(
            &self.lists.queued[pos],
            &self.config,
            output_dir,
            Arc::clone(&self.extractor),
            self.exec_tx.clone(),
        );
        exec.start();
        let rec = &mut self.lists.queued[pos];
        rec.status = JobStatus::Downloading;
        rec.last_error.clear();
        rec.destination_path = exec.output_dir().display().to_string();
        tracing::info!(job_id = %rec.id, url = %rec.url, "download started");
        let rec = rec.clone();
        self.spawn_attempts.remove(&rec.id);
        self.executors.insert(rec.id.clone(), exec);
        self.notifier.publish(QueueEvent::Updated(rec));
    }

    fn spawn_failed(&mut self, pos: usize, err: SchedulingError) {
        let id = self.lists.queued[pos].id.clone();
        let attempt = self.spawn_attempts.get(&id).map_or(0, |(n, _)| *n) + 1;
        let message = err.to_string();
        match self.retry.decide(attempt) {
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(job_id = %id, attempt, ?delay, "cannot start download, will retry: {}", message);
                self.spawn_attempts
                    .insert(id, (attempt, Instant::now() + delay));
                let rec = &mut self.lists.queued[pos];
                rec.last_error = message;
                let rec = rec.clone();
                self.notifier.publish(QueueEvent::Updated(rec));
                self.schedule_rescan(delay);
            }
            RetryDecision::NoRetry => {
                tracing::error!(job_id = %id, attempt, "cannot start download, giving up: {}", message);
                let mut rec = self.lists.queued.remove(pos);
                rec.status = JobStatus::Error;
                rec.last_error = message;
                self.move_to_completed(rec);
            }
        }
    }

    fn schedule_rescan(&self, delay: Duration) {
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal_tx.send(Internal::Rescan);
        });
    }

    async fn shutdown(&mut self, exec_rx: &mut mpsc::UnboundedReceiver<ExecutorEvent>) {
        let running: HashSet<JobId> = self.executors.keys().cloned().collect();
        let mut set = JoinSet::new();
        for (_, exec) in self.executors.drain() {
            set.spawn(exec.stop());
        }
        while set.join_next().await.is_some() {}

        // Results that arrived before the stop still count; a canceled fetch is requeued.
        let mut finished = 0;
        while let Ok(event) = exec_rx.try_recv() {
            let ExecutorEvent::Finished { id, result } = event else {
                continue;
            };
            if !running.contains(&id) || matches!(result, Err(FetchError::Canceled)) {
                continue;
            }
            if self.record_result(id, result) {
                finished += 1;
            }
        }
        let reset = reset_interrupted(&mut self.lists);
        tracing::info!(running = running.len(), finished, reset, "queue engine shutting down");
        self.persist();
        self.writer.close().await;
    }
}
