//! Ref discovery, reconciliation and the pulling workers that drive them.

mod jobs;
mod queue;
mod refs;
mod scheduler;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::debug;

use crate::error::Result;
use crate::providers::GitLabClient;
use crate::schemas::Project;
use crate::store::Store;

pub use queue::{Enqueued, PullingQueue, Task, TaskGuard};
pub use refs::{distinct_pipeline_refs, match_refs, DiscoveredRefs};
pub use scheduler::{spawn_schedules, spawn_workers, Schedules};

/// Owns everything a discovery or pull needs: the API client, the store the
/// results land in, and the queue follow-up work is requested through.
///
/// All operations take `&self` and can run concurrently. Operations that
/// reconcile a project's refs are serialized per project.
#[derive(Debug)]
pub struct Exporter {
    client: GitLabClient,
    store: Store,
    queue: PullingQueue,
    project_ids: RwLock<HashMap<String, u64>>,
    project_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Exporter {
    pub fn new(client: GitLabClient, store: Store, queue: PullingQueue) -> Self {
        Self {
            client,
            store,
            queue,
            project_ids: RwLock::new(HashMap::new()),
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn queue(&self) -> &PullingQueue {
        &self.queue
    }

    /// Numeric GitLab id of `project`, looked up on first use and cached after.
    pub async fn resolve_project_id(&self, project: &Project) -> Result<u64> {
        let cached = self
            .project_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&project.name)
            .copied();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = self.client.get_project(&project.name).await?.id;
        debug!("Caching id {id} for project {}", project.name);
        self.project_ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(project.name.clone(), id);
        Ok(id)
    }

    /// Lock serializing ref reconciliation for one project.
    fn project_lock(&self, project_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .project_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(project_name.to_string()).or_default())
    }

    /// Runs one queued task to completion.
    pub async fn run_task(&self, task: Task) -> Result<()> {
        match task {
            Task::PullProjectRefsFromProject(project) => {
                self.pull_project_refs_from_project(&project).await
            }
            Task::PullProjectRefsFromPipelines(project) => {
                self.pull_project_refs_from_pipelines(&project).await
            }
            Task::SyncProjectRefs(project) => self.sync_project_refs(&project).await.map(|_| ()),
            Task::PullProjectRefJobs(key) => self.pull_project_ref_jobs(&key).await.map(|_| ()),
        }
    }
}
