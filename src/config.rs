use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::RefscoutError;
use crate::exporter::Schedules;
use crate::schemas::{Project, ProjectParameters};

/// Configuration file structure for refscout.
///
/// Configuration files are loaded from the current directory or specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// GitLab connection settings
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// Worker pool and schedules
    #[serde(default)]
    pub pull: PullConfig,

    /// Parameters applied to every project unless overridden
    #[serde(default)]
    pub project_defaults: ProjectParameters,

    /// Monitored projects
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,

    /// GitLab personal access token
    pub token: Option<String>,

    /// Upper bound for a single API request
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum number of API requests in flight
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

/// Worker pool size and schedule intervals. An interval of 0 disables that schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PullConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Upper bound for a whole task, all of its API calls included
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,

    #[serde(default = "default_refs_from_projects_interval")]
    pub refs_from_projects_interval_seconds: u64,

    #[serde(default = "default_refs_from_pipelines_interval")]
    pub refs_from_pipelines_interval_seconds: u64,

    #[serde(default = "default_sync_refs_interval")]
    pub sync_refs_interval_seconds: u64,

    #[serde(default = "default_ref_jobs_interval")]
    pub ref_jobs_interval_seconds: u64,
}

/// A monitored project. Unset fields fall back to `project-defaults`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Full project path (e.g., 'group/project')
    pub name: String,
    pub refs_regexp: Option<String>,
    pub fetch_pipelines_refs: Option<bool>,
    pub pipelines_depth: Option<usize>,
    pub fetch_merge_requests_refs: Option<bool>,
    pub merge_requests_depth: Option<usize>,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            task_timeout_seconds: default_task_timeout_seconds(),
            refs_from_projects_interval_seconds: default_refs_from_projects_interval(),
            refs_from_pipelines_interval_seconds: default_refs_from_pipelines_interval(),
            sync_refs_interval_seconds: default_sync_refs_interval(),
            ref_jobs_interval_seconds: default_ref_jobs_interval(),
        }
    }
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_workers() -> usize {
    8
}

fn default_task_timeout_seconds() -> u64 {
    120
}

fn default_refs_from_projects_interval() -> u64 {
    300
}

fn default_refs_from_pipelines_interval() -> u64 {
    300
}

fn default_sync_refs_interval() -> u64 {
    1800
}

fn default_ref_jobs_interval() -> u64 {
    60
}

fn interval(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

impl PullConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }

    pub fn schedules(&self) -> Schedules {
        Schedules {
            refs_from_projects: interval(self.refs_from_projects_interval_seconds),
            refs_from_pipelines: interval(self.refs_from_pipelines_interval_seconds),
            sync_refs: interval(self.sync_refs_interval_seconds),
            ref_jobs: interval(self.ref_jobs_interval_seconds),
        }
    }
}

impl GitLabConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, defaults: &ProjectParameters) -> ProjectParameters {
        ProjectParameters {
            refs_regexp: self
                .refs_regexp
                .clone()
                .unwrap_or_else(|| defaults.refs_regexp.clone()),
            fetch_pipelines_refs: self
                .fetch_pipelines_refs
                .unwrap_or(defaults.fetch_pipelines_refs),
            pipelines_depth: self.pipelines_depth.unwrap_or(defaults.pipelines_depth),
            fetch_merge_requests_refs: self
                .fetch_merge_requests_refs
                .unwrap_or(defaults.fetch_merge_requests_refs),
            merge_requests_depth: self
                .merge_requests_depth
                .unwrap_or(defaults.merge_requests_depth),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./refscout.toml
    /// 3. ./refscout.json
    /// 4. ./refscout.yaml
    /// 5. ./refscout.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["refscout.toml", "refscout.json", "refscout.yaml", "refscout.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Resolves every configured project against `project-defaults`.
    ///
    /// # Errors
    ///
    /// Returns [`RefscoutError::Config`] for an empty or duplicate project name
    /// or an invalid refs regexp, so that no pull ever starts with a broken
    /// selection rule.
    pub fn projects(&self) -> std::result::Result<Vec<Project>, RefscoutError> {
        self.project_defaults.refs_regex()?;

        let mut seen = std::collections::HashSet::new();
        let mut projects = Vec::with_capacity(self.projects.len());

        for project in &self.projects {
            let name = project.name.trim();
            if name.is_empty() {
                return Err(RefscoutError::Config("project name cannot be empty".into()));
            }
            if !seen.insert(name.to_string()) {
                return Err(RefscoutError::Config(format!(
                    "project '{name}' is configured more than once"
                )));
            }

            let parameters = project.resolve(&self.project_defaults);
            parameters
                .refs_regex()
                .map_err(|e| match e {
                    RefscoutError::Config(message) => {
                        RefscoutError::Config(format!("project '{name}': {message}"))
                    }
                    other => other,
                })?;
            projects.push(Project::with_parameters(name, parameters));
        }

        Ok(projects)
    }
}
