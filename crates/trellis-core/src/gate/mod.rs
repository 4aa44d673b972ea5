//! Deferred schema work queue
//!
//! Schema directives declared before a database session exists are queued
//! here and executed in submission order once a backend becomes available.
//! Each submitted directive's outcome is observable through a [`TaskHandle`].

use crate::sync::{SyncError, SyncResult};
use crate::SchemaDirective;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// A directive waiting for a backend, paired with its completion channel
pub(crate) struct PendingTask {
    pub(crate) directive: SchemaDirective,
    pub(crate) done: oneshot::Sender<SyncResult<()>>,
}

impl PendingTask {
    pub(crate) fn new(directive: SchemaDirective) -> (Self, TaskHandle) {
        let (done, rx) = oneshot::channel();
        (Self { directive, done }, TaskHandle { rx })
    }
}

/// Awaitable completion of one submitted schema directive
pub struct TaskHandle {
    rx: oneshot::Receiver<SyncResult<()>>,
}

impl TaskHandle {
    /// Wait for the directive to execute.
    ///
    /// Resolves to the directive's result, or [`SyncError::Canceled`] if
    /// the gate was dropped before a backend became available.
    pub async fn wait(self) -> SyncResult<()> {
        self.rx.await.unwrap_or(Err(SyncError::Canceled))
    }
}

enum GateState<B> {
    Closed { pending: Vec<PendingTask> },
    Open { backend: Arc<B> },
}

/// Gate between schema declarations and a live database session.
///
/// Closed until [`open_with`](SessionGate::open_with) provides a backend;
/// while closed, submissions queue in FIFO order. Once open, submissions
/// are handed straight back to the caller for immediate execution.
pub struct SessionGate<B> {
    state: Mutex<GateState<B>>,
}

impl<B> SessionGate<B> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed {
                pending: Vec::new(),
            }),
        }
    }

    /// Whether a backend is available
    pub async fn is_open(&self) -> bool {
        matches!(*self.state.lock().await, GateState::Open { .. })
    }

    /// The backend, if the gate is open
    pub async fn backend(&self) -> Option<Arc<B>> {
        match &*self.state.lock().await {
            GateState::Open { backend } => Some(Arc::clone(backend)),
            GateState::Closed { .. } => None,
        }
    }

    /// Queue a task, or hand it back with the backend if the gate is open
    pub(crate) async fn enqueue(&self, task: PendingTask) -> Option<(Arc<B>, PendingTask)> {
        let mut state = self.state.lock().await;
        match &mut *state {
            GateState::Closed { pending } => {
                pending.push(task);
                None
            }
            GateState::Open { backend } => Some((Arc::clone(backend), task)),
        }
    }

    /// Open the gate, returning queued tasks in submission order.
    ///
    /// The caller executes the drained tasks; each is delivered at most
    /// once. Opening an already-open gate replaces the backend and drains
    /// nothing.
    pub(crate) async fn open_with(&self, backend: Arc<B>) -> Vec<PendingTask> {
        let mut state = self.state.lock().await;
        let drained = match &mut *state {
            GateState::Closed { pending } => std::mem::take(pending),
            GateState::Open { .. } => Vec::new(),
        };
        *state = GateState::Open { backend };
        drained
    }
}

impl<B> Default for SessionGate<B> {
    fn default() -> Self {
        Self::new()
    }
}
