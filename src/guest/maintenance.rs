//! Deferred cache maintenance.
//!
//! # Data Flow
//! ```text
//! GuestFetcher ──schedule()──▶ bounded mpsc queue ──▶ worker task ──▶ CredentialStore
//!                   (never awaits)       ▲                  │
//!                        │               │                  └─ failures logged, never propagated
//!                        └─ full ──▶ backlog ──▶ one drain task
//! ```
//!
//! # Design Decisions
//! - Actions run after the caller already has its result
//! - A full queue moves actions to a bounded backlog fed by a single drain
//!   task; while the backlog is non-empty every new action queues behind it
//! - Actions beyond the backlog bound are dropped and counted
//! - Actions run in the order they were scheduled; deletes are idempotent
//! - On shutdown the worker drains whatever is queued, then exits

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::guest::store::{CacheKey, CredentialStore};
use crate::observability::metrics;

/// A side effect on the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceAction {
    /// Write a freshly issued credential payload.
    Store {
        key: CacheKey,
        payload: String,
        ttl: Duration,
    },
    /// Evict the cached credential.
    Invalidate { key: CacheKey },
}

impl MaintenanceAction {
    fn label(&self) -> &'static str {
        match self {
            MaintenanceAction::Store { .. } => "store",
            MaintenanceAction::Invalidate { .. } => "invalidate",
        }
    }
}

enum Message {
    Run(MaintenanceAction),
    Flush(oneshot::Sender<()>),
}

/// Actions waiting for room in the queue.
#[derive(Default)]
struct Backlog {
    pending: VecDeque<Message>,
    draining: bool,
}

/// Handle used to schedule fire-and-forget store maintenance.
#[derive(Clone)]
pub struct MaintenanceScheduler {
    tx: mpsc::Sender<Message>,
    backlog: Arc<Mutex<Backlog>>,
    backlog_limit: usize,
}

impl MaintenanceScheduler {
    /// Start the worker. It exits once `shutdown` fires (after draining) or
    /// every scheduler handle is dropped.
    pub fn spawn(
        store: Arc<dyn CredentialStore>,
        capacity: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> (Self, JoinHandle<()>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(run_worker(store, rx, shutdown));
        let scheduler = Self {
            tx,
            backlog: Arc::new(Mutex::new(Backlog::default())),
            backlog_limit: capacity,
        };
        (scheduler, worker)
    }

    /// Queue `action` without waiting for it.
    pub fn schedule(&self, action: MaintenanceAction) {
        let label = action.label();
        tracing::debug!(action = label, "Scheduling credential maintenance");

        let mut backlog = lock(&self.backlog);
        if backlog.draining {
            if backlog.pending.len() >= self.backlog_limit {
                metrics::record_maintenance(label, "dropped");
                tracing::warn!(action = label, "Maintenance backlog full, action dropped");
                return;
            }
            backlog.pending.push_back(Message::Run(action));
            return;
        }

        match self.tx.try_send(Message::Run(action)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                backlog.pending.push_back(message);
                backlog.draining = true;
                tokio::spawn(drain_backlog(self.tx.clone(), self.backlog.clone()));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics::record_maintenance(label, "dropped");
                tracing::warn!(action = label, "Maintenance worker stopped, action dropped");
            }
        }
    }

    /// Wait until every action scheduled before this call has run.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        let direct = {
            let mut backlog = lock(&self.backlog);
            if backlog.draining {
                backlog.pending.push_back(Message::Flush(done_tx));
                None
            } else {
                Some(done_tx)
            }
        };
        if let Some(done_tx) = direct {
            if self.tx.send(Message::Flush(done_tx)).await.is_err() {
                return;
            }
        }
        let _ = done_rx.await;
    }

    /// Number of messages waiting behind a full queue.
    pub fn backlog(&self) -> usize {
        lock(&self.backlog).pending.len()
    }
}

fn lock(backlog: &Mutex<Backlog>) -> MutexGuard<'_, Backlog> {
    backlog.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feed the backlog into the queue front to back, then hand scheduling
/// back to `try_send`.
async fn drain_backlog(tx: mpsc::Sender<Message>, backlog: Arc<Mutex<Backlog>>) {
    loop {
        let next = {
            let mut backlog = lock(&backlog);
            match backlog.pending.pop_front() {
                Some(message) => message,
                None => {
                    backlog.draining = false;
                    return;
                }
            }
        };
        if tx.send(next).await.is_err() {
            let mut backlog = lock(&backlog);
            let dropped = backlog.pending.len() + 1;
            backlog.pending.clear();
            backlog.draining = false;
            tracing::warn!(dropped, "Maintenance worker stopped, backlog dropped");
            return;
        }
    }
}

async fn run_worker(
    store: Arc<dyn CredentialStore>,
    mut rx: mpsc::Receiver<Message>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            message = rx.recv() => match message {
                Some(message) => handle(store.as_ref(), message).await,
                None => break,
            },
            _ = shutdown.recv() => {
                rx.close();
                while let Some(message) = rx.recv().await {
                    handle(store.as_ref(), message).await;
                }
                tracing::info!("Maintenance worker drained");
                break;
            }
        }
    }
}

async fn handle(store: &dyn CredentialStore, message: Message) {
    match message {
        Message::Run(action) => apply(store, action).await,
        Message::Flush(done) => {
            let _ = done.send(());
        }
    }
}

async fn apply(store: &dyn CredentialStore, action: MaintenanceAction) {
    let label = action.label();
    let result = match &action {
        MaintenanceAction::Store { key, payload, ttl } => {
            store.put(key, payload.clone(), *ttl).await.map(|()| true)
        }
        MaintenanceAction::Invalidate { key } => store.delete(key).await,
    };

    match result {
        Ok(changed) => {
            metrics::record_maintenance(label, "ok");
            tracing::debug!(action = label, changed, "Credential maintenance applied");
        }
        Err(e) => {
            metrics::record_maintenance(label, "error");
            tracing::warn!(action = label, error = %e, "Credential maintenance failed");
        }
    }
}
