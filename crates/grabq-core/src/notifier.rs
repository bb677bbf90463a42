//! Fan-out of queue events to subscribers and registered observers.
//!
//! Publishing never blocks the engine: events go into a broadcast channel and
//! each observer drains its own receiver in its own task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::job::{JobId, JobRecord};

/// Events buffered per receiver before a slow one starts skipping.
const EVENT_CAPACITY: usize = 1024;

/// An engine event, serialized as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum QueueEvent {
    Added(JobRecord),
    Updated(JobRecord),
    Completed(JobRecord),
    Canceled(JobId),
    Cleared,
}

impl QueueEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::Added(_) => "added",
            QueueEvent::Updated(_) => "updated",
            QueueEvent::Completed(_) => "completed",
            QueueEvent::Canceled(_) => "canceled",
            QueueEvent::Cleared => "cleared",
        }
    }

    /// Id of the job the event is about, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            QueueEvent::Added(r) | QueueEvent::Updated(r) | QueueEvent::Completed(r) => Some(&r.id),
            QueueEvent::Canceled(id) => Some(id),
            QueueEvent::Cleared => None,
        }
    }
}

/// Receives queue events in its own task.
#[async_trait]
pub trait QueueObserver: Send + Sync {
    async fn on_event(&self, event: &QueueEvent) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<QueueEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish to everyone currently subscribed. No subscribers is not an error.
    pub fn publish(&self, event: QueueEvent) {
        tracing::trace!(event = event.name(), job_id = ?event.job_id(), "publish");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Run `observer` for every subsequent event. A failure or panic on one
    /// event is logged and the observer keeps receiving the next ones.
    pub fn register(&self, observer: Arc<dyn QueueObserver>) {
        let rx = self.tx.subscribe();
        tokio::spawn(run_observer(rx, observer));
    }
}

async fn run_observer(mut rx: broadcast::Receiver<QueueEvent>, observer: Arc<dyn QueueObserver>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let name = event.name();
                let observer = Arc::clone(&observer);
                match tokio::spawn(async move { observer.on_event(&event).await }).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(event = name, "queue observer failed: {:#}", e),
                    Err(e) if e.is_panic() => {
                        tracing::error!(event = name, "queue observer panicked")
                    }
                    Err(_) => {}
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("queue observer lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::debug!("queue event channel closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recorder(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl QueueObserver for Recorder {
        async fn on_event(&self, event: &QueueEvent) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(event.name());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl QueueObserver for Failing {
        async fn on_event(&self, _event: &QueueEvent) -> anyhow::Result<()> {
            anyhow::bail!("socket closed")
        }
    }

    struct Panicking;

    #[async_trait]
    impl QueueObserver for Panicking {
        async fn on_event(&self, _event: &QueueEvent) -> anyhow::Result<()> {
            panic!("observer bug")
        }
    }

    /// Panics on `cleared`, records everything else.
    struct PanicsOnCleared(Mutex<Vec<&'static str>>);

    #[async_trait]
    impl QueueObserver for PanicsOnCleared {
        async fn on_event(&self, event: &QueueEvent) -> anyhow::Result<()> {
            if *event == QueueEvent::Cleared {
                panic!("cannot handle cleared");
            }
            self.0.lock().unwrap().push(event.name());
            Ok(())
        }
    }

    #[test]
    fn events_serialize_with_tag_and_data() {
        let json = serde_json::to_value(QueueEvent::Canceled(JobId::from("abc"))).unwrap();
        assert_eq!(json, serde_json::json!({"event": "canceled", "data": "abc"}));

        let json = serde_json::to_value(QueueEvent::Cleared).unwrap();
        assert_eq!(json, serde_json::json!({"event": "cleared"}));

        let record = JobRecord::new("https://v.example/1", "t", None, None, None, true);
        let json = serde_json::to_value(QueueEvent::Added(record.clone())).unwrap();
        assert_eq!(json["event"], "added");
        assert_eq!(json["data"]["url"], "https://v.example/1");
        let back: QueueEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, QueueEvent::Added(record));
    }

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.publish(QueueEvent::Canceled(JobId::from("1")));
        notifier.publish(QueueEvent::Cleared);
        assert_eq!(rx.recv().await.unwrap(), QueueEvent::Canceled(JobId::from("1")));
        assert_eq!(rx.recv().await.unwrap(), QueueEvent::Cleared);
    }

    #[tokio::test]
    async fn bad_observers_do_not_affect_good_ones() {
        let notifier = Notifier::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        notifier.register(Arc::new(Panicking));
        notifier.register(Arc::new(Failing));
        notifier.register(recorder.clone());

        notifier.publish(QueueEvent::Cleared);
        notifier.publish(QueueEvent::Canceled(JobId::from("x")));

        for _ in 0..100 {
            if recorder.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*recorder.0.lock().unwrap(), vec!["cleared", "canceled"]);
    }

    #[tokio::test]
    async fn observer_keeps_receiving_after_a_panic() {
        let notifier = Notifier::new();
        let observer = Arc::new(PanicsOnCleared(Mutex::new(Vec::new())));
        notifier.register(observer.clone());

        notifier.publish(QueueEvent::Cleared);
        notifier.publish(QueueEvent::Canceled(JobId::from("a")));
        notifier.publish(QueueEvent::Canceled(JobId::from("b")));

        for _ in 0..100 {
            if observer.0.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*observer.0.lock().unwrap(), vec!["canceled", "canceled"]);
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        Notifier::new().publish(QueueEvent::Cleared);
    }
}
