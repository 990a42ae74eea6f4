//! Single-worker operation executor with per-operation event channels.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use filedeck_core::{EngineConfig, OpError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::engine::Engine;
use crate::operation::{OperationKind, OperationRequest};
use crate::progress::{OperationEvent, OperationOutcome, OperationProgress};

/// Callback told which directory changed after a successful operation.
pub type DirectoryListener = Arc<dyn Fn(&Path) + Send + Sync>;

/// How [`OperationExecutor::shutdown`] treats outstanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Finish the running operation and everything queued behind it.
    Drain,
    /// Cancel the running operation; queued ones complete as cancelled.
    Cancel,
}

struct Job {
    id: u64,
    request: OperationRequest,
    cancel: CancellationToken,
    progress: mpsc::Sender<OperationEvent>,
    done: oneshot::Sender<OperationOutcome>,
}

/// Runs operations one at a time, in submission order, off the caller's
/// thread.
///
/// Each submission returns an [`OperationHandle`] that receives progress
/// and exactly one terminal outcome. The outcome travels on its own
/// channel, so an unread handle never holds up the operations queued
/// behind it. The worker is a Tokio task that hands
/// every operation to the blocking pool, so the executor must be created
/// inside a Tokio runtime.
pub struct OperationExecutor {
    engine: Engine,
    queue: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
    listener: Option<DirectoryListener>,
    next_id: AtomicU64,
}

impl fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("engine", &self.engine)
            .field("running", &self.queue.is_some())
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl OperationExecutor {
    /// Create an executor backed by the real filesystem.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(Engine::new(config))
    }

    /// Create an executor that runs operations on `engine`.
    pub fn with_engine(engine: Engine) -> Self {
        let (queue, jobs) = mpsc::channel(engine.config().queue_capacity.max(1));
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_worker(engine.clone(), jobs));

        Self {
            engine,
            queue: Some(queue),
            worker: Some(worker),
            shutdown,
            listener: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for directories changed by successful operations.
    ///
    /// The callback runs on the task that awaits the [`OperationHandle`],
    /// never on the worker.
    pub fn with_directory_listener(
        mut self,
        listener: impl Fn(&Path) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// The engine operations run on.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Queue `request` behind everything submitted earlier.
    ///
    /// Waits while the queue is full. Fails only once the executor has shut
    /// down; problems with the request itself are reported in its outcome.
    pub async fn submit(&self, request: OperationRequest) -> Result<OperationHandle, OpError> {
        let queue = self.queue.as_ref().ok_or(OpError::ExecutorClosed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = request.kind();
        let items = request.item_count();
        let cancel = self.shutdown.child_token();
        let (progress, events) = mpsc::channel(self.engine.config().event_channel_size.max(1));
        let (done, outcome) = oneshot::channel();

        queue
            .send(Job {
                id,
                request,
                cancel: cancel.clone(),
                progress,
                done,
            })
            .await
            .map_err(|_| OpError::ExecutorClosed)?;
        debug!(id, %kind, "Operation queued");

        Ok(OperationHandle {
            id,
            kind,
            items,
            events: Some(events),
            outcome: Some(outcome),
            cancel,
            listener: self.listener.clone(),
        })
    }

    /// Stop accepting work and wait for the worker to exit.
    pub async fn shutdown(mut self, mode: ShutdownMode) {
        if mode == ShutdownMode::Cancel {
            self.shutdown.cancel();
        }
        self.queue.take();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!(error = %e, "Operation worker terminated abnormally");
            }
        }
    }
}

impl Drop for OperationExecutor {
    fn drop(&mut self) {
        // Cancels whatever is still running; the worker exits once the
        // queue drains.
        self.shutdown.cancel();
    }
}

async fn run_worker(engine: Engine, mut jobs: mpsc::Receiver<Job>) {
    while let Some(job) = jobs.recv().await {
        let Job {
            id,
            request,
            cancel,
            progress,
            done,
        } = job;
        let kind = request.kind();
        let items = request.item_count();

        let outcome = if cancel.is_cancelled() {
            debug!(id, %kind, "Operation cancelled before it started");
            OperationOutcome::cancelled(kind, items)
        } else {
            let engine = engine.with_cancellation(cancel);
            let task = tokio::task::spawn_blocking(move || {
                engine.execute(&request, |update| {
                    // Progress is lossy; only the outcome must arrive.
                    let _ = progress.try_send(OperationEvent::Progress(update));
                })
            });

            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(id, %kind, error = %e, "Operation worker panicked");
                    OperationOutcome::failed(
                        kind,
                        items,
                        PathBuf::new(),
                        &OpError::WorkerFailed {
                            message: e.to_string(),
                        },
                    )
                }
            }
        };

        if done.send(outcome).is_err() {
            debug!(id, "Operation handle dropped before completion");
        }
    }

    debug!("Operation worker stopped");
}

/// Receives the events of one submitted operation.
pub struct OperationHandle {
    id: u64,
    kind: OperationKind,
    items: usize,
    events: Option<mpsc::Receiver<OperationEvent>>,
    outcome: Option<oneshot::Receiver<OperationOutcome>>,
    cancel: CancellationToken,
    listener: Option<DirectoryListener>,
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl OperationHandle {
    /// Identifier unique within the executor.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Ask the operation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this operation, for wiring to external signals.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` after the outcome was delivered.
    ///
    /// Progress comes first; the outcome follows once the operation has
    /// dropped its progress sender. Receiving the outcome notifies the
    /// directory listener.
    pub async fn recv(&mut self) -> Option<OperationEvent> {
        if let Some(events) = &mut self.events {
            match events.recv().await {
                Some(event) => return Some(event),
                None => self.events = None,
            }
        }

        let outcome = self.outcome.take()?.await.ok()?;
        self.notify(&outcome);
        Some(OperationEvent::Complete(outcome))
    }

    /// Wait for the outcome, passing progress updates to `on_progress`.
    pub async fn wait(mut self, mut on_progress: impl FnMut(&OperationProgress)) -> OperationOutcome {
        while let Some(event) = self.recv().await {
            match event {
                OperationEvent::Progress(progress) => on_progress(&progress),
                OperationEvent::Complete(outcome) => return outcome,
            }
        }

        warn!(id = self.id, kind = %self.kind, "Operation ended without an outcome");
        OperationOutcome::failed(self.kind, self.items, PathBuf::new(), &OpError::ExecutorClosed)
    }

    fn notify(&self, outcome: &OperationOutcome) {
        if outcome.success_count == 0 {
            return;
        }
        if let (Some(listener), Some(dir)) = (&self.listener, &outcome.affected_directory) {
            listener(dir);
        }
    }
}
