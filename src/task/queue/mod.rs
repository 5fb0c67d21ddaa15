// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! FIFO task queue drained by a single worker thread.
//!
//! ```text
//!  producers                      Shared
//!  submit/enqueue --lock--> ,----------------------,
//!  cancel        --lock--> | pending: VecDeque     |
//!  shutdown      --lock--> | running: bool         |
//!                          '----------+------------'
//!                                     | Condvar::wait while empty && running
//!                                     v
//!                               worker thread
//!                      pop_front --> handler.handle(request, sink)
//!                                     |  (panics caught)
//!                                     v
//!                  flume::Sender<QueueEvent> --> caller's Receiver
//!
//!  shutdown: running = false, notify, worker finishes the in-flight task,
//!            fails what is still pending, exits; join.
//! ```

#[cfg(test)]
mod tests;

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use flume::{Receiver, Sender};
use tracing::{debug, error, info, trace, warn};

use super::{ProgressEvent, QueueEvent, RequestId, TaskKind, TaskRequest, TaskResult};
use crate::error::{QueueError, SardineResult};

/// Message of results for requests dropped by shutdown.
pub const SHUTDOWN_MESSAGE: &str = "queue shut down before the task started";

/// Executes one request on the worker thread.
pub trait TaskHandler: Send + 'static {
    fn handle(&self, request: &TaskRequest, progress: &ProgressSink) -> TaskResult;
}

impl<F> TaskHandler for F
where
    F: Fn(&TaskRequest, &ProgressSink) -> TaskResult + Send + 'static,
{
    fn handle(&self, request: &TaskRequest, progress: &ProgressSink) -> TaskResult {
        self(request, progress)
    }
}

/// Progress reporter bound to one request.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    request_id: RequestId,
    events: Sender<QueueEvent>,
}

impl ProgressSink {
    fn new(request_id: RequestId, events: Sender<QueueEvent>) -> Self {
        Self { request_id, events }
    }

    /// Emit a progress event; `percent` is clamped to 100.
    pub fn report(&self, percent: u8, label: impl Into<String>) {
        let event = ProgressEvent {
            request_id: self.request_id,
            percent: percent.min(100),
            label: label.into(),
        };
        trace!(request_id = event.request_id, percent = event.percent, label = %event.label, "progress");
        // The caller may have stopped listening
        let _ = self.events.send(QueueEvent::Progress(event));
    }
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<TaskRequest>,
    running: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
    next_id: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running queue. Dropping it shuts the worker down.
#[derive(Debug)]
pub struct TaskQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl TaskQueue {
    /// Spawn the worker thread and return the queue with its event receiver.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::WorkerSpawn` if the thread cannot be created.
    pub fn start<H: TaskHandler>(handler: H) -> SardineResult<(Self, Receiver<QueueEvent>)> {
        let (events, receiver) = flume::unbounded();
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: true,
            }),
            wake: Condvar::new(),
            next_id: AtomicU64::new(1),
        });

        let worker = thread::Builder::new()
            .name("sardine-worker".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_worker(&handler, &shared, &events)
            })
            .map_err(QueueError::WorkerSpawn)?;

        debug!("task queue started");
        Ok((
            Self {
                shared,
                worker: Some(worker),
            },
            receiver,
        ))
    }

    /// Allocate the next request id without enqueueing anything.
    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        self.shared.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a request with a fresh id and enqueue it.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ShutDown` once the queue is stopped.
    pub fn submit(
        &self,
        kind: TaskKind,
        repo_path: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> SardineResult<RequestId> {
        let request = TaskRequest::new(self.next_request_id(), kind, repo_path, args);
        let id = request.request_id;
        self.enqueue(request)?;
        Ok(id)
    }

    /// Append a request and wake the worker.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ShutDown` once the queue is stopped.
    pub fn enqueue(&self, request: TaskRequest) -> SardineResult<()> {
        let mut state = self.shared.lock();
        if !state.running {
            return Err(QueueError::ShutDown.into());
        }
        debug!(
            request_id = request.request_id,
            kind = %request.kind,
            repo = %request.repo_path.display(),
            "enqueued"
        );
        state.pending.push_back(request);
        drop(state);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Remove still-queued requests with `request_id`; running work is not
    /// affected. Returns how many entries were removed.
    pub fn cancel(&self, request_id: RequestId) -> usize {
        let mut state = self.shared.lock();
        let before = state.pending.len();
        state.pending.retain(|r| r.request_id != request_id);
        let removed = before - state.pending.len();
        if removed > 0 {
            debug!(request_id, removed, "cancelled");
        }
        removed
    }

    /// Number of requests waiting to start.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Stop accepting work, let the worker finish its current task, and join it.
    pub fn shutdown(&mut self) {
        self.shared.lock().running = false;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("task worker terminated abnormally");
            }
            debug!("task queue stopped");
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<H: TaskHandler>(handler: &H, shared: &Shared, events: &Sender<QueueEvent>) {
    loop {
        let request = {
            let mut state = shared.lock();
            while state.running && state.pending.is_empty() {
                state = shared
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if !state.running {
                let orphaned: Vec<TaskRequest> = state.pending.drain(..).collect();
                drop(state);
                fail_orphaned(&orphaned, events);
                return;
            }
            state.pending.pop_front()
        };

        if let Some(request) = request {
            let result = execute(handler, &request, events);
            if events.send(QueueEvent::Completed(result)).is_err() {
                trace!(request_id = request.request_id, "result dropped, no receiver");
            }
        }
    }
}

fn execute<H: TaskHandler>(
    handler: &H,
    request: &TaskRequest,
    events: &Sender<QueueEvent>,
) -> TaskResult {
    let sink = ProgressSink::new(request.request_id, events.clone());
    let started = Instant::now();
    debug!(
        request_id = request.request_id,
        kind = %request.kind,
        repo = %request.repo_path.display(),
        "task started"
    );

    let mut result = match catch_unwind(AssertUnwindSafe(|| handler.handle(request, &sink))) {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(request_id = request.request_id, kind = %request.kind, reason = %reason, "task panicked");
            TaskResult::failed(request, format!("task panicked: {reason}"))
        }
    };
    result.request_id = request.request_id;
    result.kind = request.kind;

    let elapsed_ms = started.elapsed().as_millis();
    if result.success {
        info!(request_id = request.request_id, kind = %request.kind, elapsed_ms, message = %result.message, "task succeeded");
    } else {
        warn!(request_id = request.request_id, kind = %request.kind, elapsed_ms, message = %result.message, "task failed");
    }
    result
}

fn fail_orphaned(orphaned: &[TaskRequest], events: &Sender<QueueEvent>) {
    for request in orphaned {
        debug!(request_id = request.request_id, kind = %request.kind, "dropped by shutdown");
        let _ = events.send(QueueEvent::Completed(TaskResult::failed(
            request,
            SHUTDOWN_MESSAGE,
        )));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
