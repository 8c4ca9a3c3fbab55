use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::schemas::{Project, ProjectRefKey};

/// Unit of work handed to the pulling workers.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    PullProjectRefsFromProject(Project),
    PullProjectRefsFromPipelines(Project),
    /// Full discovery pass that also retires refs no longer selected
    SyncProjectRefs(Project),
    PullProjectRefJobs(ProjectRefKey),
}

impl Task {
    /// Deduplication key: at most one task per key is queued or running.
    ///
    /// Discovery tasks are keyed by kind and project, so a sync and a pull of
    /// the same project can both be outstanding. They never run at the same
    /// time: the exporter serializes them on a per-project lock, and the later
    /// one holds its worker until the earlier one finishes. A single key per
    /// project would let one schedule's task keep dropping another's when
    /// their intervals line up.
    pub fn key(&self) -> String {
        match self {
            Self::PullProjectRefsFromProject(p) => format!("refs-from-project:{}", p.name),
            Self::PullProjectRefsFromPipelines(p) => format!("refs-from-pipelines:{}", p.name),
            Self::SyncProjectRefs(p) => format!("sync-refs:{}", p.name),
            Self::PullProjectRefJobs(key) => format!("ref-jobs:{key}"),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug)]
struct QueueInner {
    outstanding: Mutex<HashSet<String>>,
    sender: mpsc::UnboundedSender<Task>,
}

/// Outcome of [`PullingQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The task was handed to the workers.
    Queued,
    /// A task with the same key is already queued or running; this one was dropped.
    AlreadyQueued,
    /// The workers are gone; the task was dropped and its key released.
    Closed,
}

impl Enqueued {
    pub fn already_queued(self) -> bool {
        self == Self::AlreadyQueued
    }
}

/// Work queue with at most one outstanding request per task key.
///
/// A key stays outstanding from [`PullingQueue::enqueue`] until the worker
/// running it drops the [`TaskGuard`] returned by [`PullingQueue::start`].
#[derive(Debug, Clone)]
pub struct PullingQueue {
    inner: Arc<QueueInner>,
}

impl PullingQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            inner: Arc::new(QueueInner {
                outstanding: Mutex::new(HashSet::new()),
                sender,
            }),
        };
        (queue, receiver)
    }

    // Keys are only inserted or removed whole; a poisoned set is still consistent.
    fn outstanding(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `task` unless a task with the same key is already queued or running.
    pub fn enqueue(&self, task: Task) -> Enqueued {
        let key = task.key();
        if !self.outstanding().insert(key.clone()) {
            debug!("Task {key} already queued, skipping");
            return Enqueued::AlreadyQueued;
        }

        if self.inner.sender.send(task).is_err() {
            warn!("Pulling queue closed, dropping task {key}");
            self.release(&key);
            return Enqueued::Closed;
        }
        Enqueued::Queued
    }

    /// Marks a received task as running. The key is released when the guard drops.
    pub fn start(&self, task: &Task) -> TaskGuard {
        TaskGuard {
            queue: self.clone(),
            key: task.key(),
        }
    }

    pub fn is_outstanding(&self, task: &Task) -> bool {
        self.outstanding().contains(&task.key())
    }

    /// Number of tasks queued or running.
    pub fn len(&self) -> usize {
        self.outstanding().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str) {
        self.outstanding().remove(key);
    }
}

/// Holds a task key outstanding while its task runs.
#[derive(Debug)]
pub struct TaskGuard {
    queue: PullingQueue,
    key: String,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.queue.release(&self.key);
    }
}
