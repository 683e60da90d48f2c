//! Background delivery of breach events.
//!
//! [`AlertPublisher::publish`] never waits on the transport: it enqueues the
//! event and returns. A single worker task drains the queue, serializes each
//! event and sends it, retrying transient failures with exponential backoff up
//! to `max_retries` times. Delivery failures are logged and never reach the
//! caller.

use std::sync::Arc;

use tokio::{
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
};

use crate::{AlertConfig, AlertTransport, BreachEvent, RetryPolicy};

pub struct AlertPublisher {
    sender: mpsc::Sender<BreachEvent>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AlertPublisher {
    /// Start the delivery worker on the current tokio runtime.
    pub fn spawn(transport: Arc<dyn AlertTransport>, config: &AlertConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = AlertWorker {
            transport,
            topic: config.topic.clone(),
            retry: RetryPolicy::from_config(config),
        };
        let handle = tokio::spawn(worker.run(receiver, shutdown_rx));

        Self {
            sender,
            shutdown,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Hand an event to the worker without blocking.
    ///
    /// When the queue is full the event is handed to a detached task that waits
    /// for capacity, so the caller still returns immediately.
    pub fn publish(&self, event: BreachEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    event_id = %event.id(),
                    "Alert queue full, deferring breach alert"
                );
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if let Err(mpsc::error::SendError(event)) = sender.send(event).await {
                        tracing::error!(
                            event_id = %event.id(),
                            username = %event.username(),
                            "Alert publisher closed before breach alert could be queued"
                        );
                    }
                });
            }
            Err(TrySendError::Closed(event)) => {
                tracing::error!(
                    event_id = %event.id(),
                    username = %event.username(),
                    "Alert publisher is shut down, breach alert not delivered"
                );
            }
        }
    }

    /// Stop accepting events, deliver everything already queued, and wait for
    /// the worker to exit. Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Alert worker terminated abnormally");
            }
        }
    }
}

struct AlertWorker {
    transport: Arc<dyn AlertTransport>,
    topic: String,
    retry: RetryPolicy,
}

impl AlertWorker {
    async fn run(
        self,
        mut receiver: mpsc::Receiver<BreachEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(event) => {
                        self.deliver(&event).await;
                    }
                    None => break,
                },
                _ = shutdown.changed() => {
                    receiver.close();
                    while let Some(event) = receiver.recv().await {
                        self.deliver(&event).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("Alert worker stopped");
    }

    /// Returns whether the event was accepted by the transport.
    async fn deliver(&self, event: &BreachEvent) -> bool {
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, event_id = %event.id(), "Failed to serialize breach alert");
                return false;
            }
        };

        for attempt in 0..=self.retry.max_retries {
            match self.transport.send(&self.topic, &payload).await {
                Ok(()) => {
                    tracing::info!(
                        event_id = %event.id(),
                        username = %event.username(),
                        attempts = event.attempt_count(),
                        topic = %self.topic,
                        "Breach alert delivered"
                    );
                    return true;
                }
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    let delay = self.retry.delay(attempt + 1);
                    tracing::warn!(
                        event_id = %event.id(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Breach alert delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event.id(),
                        username = %event.username(),
                        attempt = attempt + 1,
                        error = %e,
                        "Breach alert delivery failed"
                    );
                    return false;
                }
            }
        }

        false
    }
}
