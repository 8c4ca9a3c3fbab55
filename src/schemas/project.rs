use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RefscoutError, Result};

pub const DEFAULT_REFS_REGEXP: &str = "^(main|master)$";

/// How refs of a project are selected and where they are discovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectParameters {
    /// Branches and tags whose name matches this pattern are tracked
    #[serde(default = "default_refs_regexp")]
    pub refs_regexp: String,

    /// Also discover refs from the project's recent pipelines
    #[serde(default)]
    pub fetch_pipelines_refs: bool,

    /// Number of recent pipelines scanned for plain refs
    #[serde(default = "default_pipelines_depth")]
    pub pipelines_depth: usize,

    /// Also discover merge-request refs during a full sync
    #[serde(default)]
    pub fetch_merge_requests_refs: bool,

    /// Number of recent pipelines scanned for merge-request refs
    #[serde(default = "default_merge_requests_depth")]
    pub merge_requests_depth: usize,
}

impl Default for ProjectParameters {
    fn default() -> Self {
        Self {
            refs_regexp: default_refs_regexp(),
            fetch_pipelines_refs: false,
            pipelines_depth: default_pipelines_depth(),
            fetch_merge_requests_refs: false,
            merge_requests_depth: default_merge_requests_depth(),
        }
    }
}

impl ProjectParameters {
    /// Compiles the ref selection pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is not a valid regex.
    pub fn refs_regex(&self) -> Result<Regex> {
        Regex::new(&self.refs_regexp).map_err(|e| {
            RefscoutError::Config(format!("invalid refs regexp '{}': {e}", self.refs_regexp))
        })
    }
}

fn default_refs_regexp() -> String {
    DEFAULT_REFS_REGEXP.to_string()
}

fn default_pipelines_depth() -> usize {
    100
}

fn default_merge_requests_depth() -> usize {
    10
}

/// A monitored GitLab project, identified by its full path (e.g. `group/subgroup/repo`).
///
/// The numeric id is not part of the project itself: it is resolved on first use
/// and cached by the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub parameters: ProjectParameters,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: ProjectParameters::default(),
        }
    }

    pub fn with_parameters(name: impl Into<String>, parameters: ProjectParameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}
