use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known snapshot of a CI job, as returned by the GitLab jobs API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub status: String,
    /// Execution time in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Time spent waiting for a runner, in seconds
    #[serde(default)]
    pub queued_duration: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pipeline: Option<JobPipeline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPipeline {
    pub id: u64,
    #[serde(default, rename = "ref")]
    pub ref_: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
