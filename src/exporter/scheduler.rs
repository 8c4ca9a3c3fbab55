use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Exporter, Task};
use crate::error::{FetchError, RefscoutError};
use crate::schemas::Project;

/// How often each kind of work is requested. `None` disables a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedules {
    pub refs_from_projects: Option<Duration>,
    pub refs_from_pipelines: Option<Duration>,
    pub sync_refs: Option<Duration>,
    pub ref_jobs: Option<Duration>,
}

/// Starts `workers` tasks that run queued work until the queue's sender side
/// is gone. Each task is bounded by `task_timeout`.
pub fn spawn_workers(
    exporter: Arc<Exporter>,
    receiver: UnboundedReceiver<Task>,
    workers: usize,
    task_timeout: Duration,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    (0..workers.max(1))
        .map(|worker| {
            let exporter = Arc::clone(&exporter);
            let receiver = Arc::clone(&receiver);
            tokio::spawn(run_worker(worker, exporter, receiver, task_timeout))
        })
        .collect()
}

async fn run_worker(
    worker: usize,
    exporter: Arc<Exporter>,
    receiver: Arc<Mutex<UnboundedReceiver<Task>>>,
    task_timeout: Duration,
) {
    debug!("Worker {worker} started");
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let _guard = exporter.queue().start(&task);
        let key = task.key();

        let outcome = tokio::time::timeout(task_timeout, exporter.run_task(task))
            .await
            .unwrap_or_else(|_| {
                Err(RefscoutError::Fetch(FetchError::Timeout {
                    operation: key.clone(),
                }))
            });

        match outcome {
            Ok(()) => debug!("Worker {worker} finished {key}"),
            Err(e) if e.is_fetch() => warn!("Task {key} failed: {e}"),
            Err(e) => error!("Task {key} failed: {e}"),
        }
    }
    debug!("Worker {worker} stopped");
}

/// Starts the periodic producers that feed the pulling queue.
pub fn spawn_schedules(
    exporter: Arc<Exporter>,
    projects: Arc<Vec<Project>>,
    schedules: &Schedules,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(every) = schedules.refs_from_projects {
        let exporter = Arc::clone(&exporter);
        let projects = Arc::clone(&projects);
        handles.push(spawn_schedule("refs-from-projects", every, move || {
            for project in projects.iter() {
                exporter
                    .queue()
                    .enqueue(Task::PullProjectRefsFromProject(project.clone()));
            }
        }));
    }

    if let Some(every) = schedules.refs_from_pipelines {
        let exporter = Arc::clone(&exporter);
        let projects = Arc::clone(&projects);
        handles.push(spawn_schedule("refs-from-pipelines", every, move || {
            for project in projects.iter().filter(|p| p.parameters.fetch_pipelines_refs) {
                exporter
                    .queue()
                    .enqueue(Task::PullProjectRefsFromPipelines(project.clone()));
            }
        }));
    }

    if let Some(every) = schedules.sync_refs {
        let exporter = Arc::clone(&exporter);
        let projects = Arc::clone(&projects);
        handles.push(spawn_schedule("sync-refs", every, move || {
            match exporter.retire_unconfigured_projects(&projects) {
                Ok(0) => {}
                Ok(retired) => info!("Retired {retired} refs of unconfigured projects"),
                Err(e) => warn!("Failed to retire refs of unconfigured projects: {e}"),
            }
            for project in projects.iter() {
                exporter
                    .queue()
                    .enqueue(Task::SyncProjectRefs(project.clone()));
            }
        }));
    }

    if let Some(every) = schedules.ref_jobs {
        let exporter = Arc::clone(&exporter);
        handles.push(spawn_schedule("ref-jobs", every, move || {
            match exporter.store().keys() {
                Ok(keys) => {
                    for key in keys {
                        exporter.queue().enqueue(Task::PullProjectRefJobs(key));
                    }
                }
                Err(e) => warn!("Failed to list tracked refs: {e}"),
            }
        }));
    }

    handles
}

fn spawn_schedule<F>(name: &'static str, every: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            debug!("Running {name} schedule");
            tick();
        }
    })
}
