use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::Job;
use super::project::Project;

/// Pipelines triggered for merge requests run on refs under this prefix.
pub const MERGE_REQUEST_REF_PREFIX: &str = "refs/merge-requests/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectRefKind {
    Branch,
    Tag,
    MergeRequest,
}

impl ProjectRefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::MergeRequest => "merge-request",
        }
    }

    /// Classifies a ref seen in pipeline history.
    ///
    /// Anything that is not a merge-request ref is treated as a branch; the
    /// branch is not checked for existence.
    pub fn from_pipeline_ref(ref_: &str) -> Self {
        if ref_.starts_with(MERGE_REQUEST_REF_PREFIX) {
            Self::MergeRequest
        } else {
            Self::Branch
        }
    }
}

impl fmt::Display for ProjectRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key of a [`ProjectRef`].
///
/// Ten decimal digits of the CRC-32 (IEEE) checksum of
/// `project name + kind + ref name`, zero padded. The same configuration
/// always yields the same key, across restarts and releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRefKey(String);

impl ProjectRefKey {
    pub fn new(project_name: &str, kind: ProjectRefKind, ref_: &str) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(project_name.as_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(ref_.as_bytes());
        Self(format!("{:010}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectRefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked ref of a project and the jobs last seen on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub project: Project,
    pub kind: ProjectRefKind,
    /// GitLab numeric id of the owning project
    pub id: u64,
    #[serde(rename = "ref")]
    pub ref_: String,
    /// Last-known job snapshot, keyed by job name
    #[serde(default)]
    pub jobs: HashMap<String, Job>,
}

impl ProjectRef {
    /// A freshly discovered ref, with no jobs pulled yet.
    pub fn new(project: Project, kind: ProjectRefKind, id: u64, ref_: impl Into<String>) -> Self {
        Self {
            project,
            kind,
            id,
            ref_: ref_.into(),
            jobs: HashMap::new(),
        }
    }

    pub fn key(&self) -> ProjectRefKey {
        ProjectRefKey::new(&self.project.name, self.kind, &self.ref_)
    }

    /// Records jobs from a newer pull.
    ///
    /// Entries are only added or replaced, never removed. A job is replaced
    /// only by a job with the same name and an equal or higher id, so an
    /// out-of-order pull cannot roll a job back.
    pub fn merge_jobs(&mut self, jobs: impl IntoIterator<Item = Job>) -> usize {
        let mut changed = 0;
        for job in jobs {
            match self.jobs.get(&job.name) {
                Some(current) if current.id > job.id => {}
                Some(current) if *current == job => {}
                _ => {
                    self.jobs.insert(job.name.clone(), job);
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// Every tracked ref, by key.
pub type ProjectsRefs = HashMap<ProjectRefKey, ProjectRef>;

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u64, name: &str, status: &str) -> Job {
        Job {
            id,
            name: name.to_string(),
            stage: "test".to_string(),
            status: status.to_string(),
            duration: Some(1.0),
            queued_duration: None,
            created_at: None,
            started_at: None,
            finished_at: None,
            pipeline: None,
        }
    }

    #[test]
    fn test_key_is_deterministic_and_fixed_width() {
        let a = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");
        let b = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 10);
        assert!(a.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_key_depends_on_project_kind_and_ref() {
        let base = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");
        assert_ne!(base, ProjectRefKey::new("foo/baz", ProjectRefKind::Branch, "main"));
        assert_ne!(base, ProjectRefKey::new("foo/bar", ProjectRefKind::Tag, "main"));
        assert_ne!(base, ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "dev"));
    }

    #[test]
    fn test_key_matches_project_ref_key() {
        let pr = ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Tag, 1, "v1.0.0");
        assert_eq!(
            pr.key(),
            ProjectRefKey::new("foo/bar", ProjectRefKind::Tag, "v1.0.0")
        );
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ProjectRefKind::MergeRequest).unwrap(),
            "\"merge-request\""
        );
        assert_eq!(ProjectRefKind::Tag.to_string(), "tag");
    }

    #[test]
    fn test_pipeline_ref_classification() {
        assert_eq!(
            ProjectRefKind::from_pipeline_ref("refs/merge-requests/12/head"),
            ProjectRefKind::MergeRequest
        );
        assert_eq!(ProjectRefKind::from_pipeline_ref("main"), ProjectRefKind::Branch);
        assert_eq!(
            ProjectRefKind::from_pipeline_ref("v1.0.0"),
            ProjectRefKind::Branch
        );
    }

    #[test]
    fn test_merge_jobs_never_drops_or_rolls_back() {
        let mut pr = ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Branch, 1, "main");
        assert_eq!(pr.merge_jobs(vec![job(10, "build", "success"), job(11, "test", "failed")]), 2);

        // Older build is ignored, newer test replaces, lint is added
        let changed = pr.merge_jobs(vec![
            job(5, "build", "failed"),
            job(20, "test", "success"),
            job(21, "lint", "success"),
        ]);
        assert_eq!(changed, 2);
        assert_eq!(pr.jobs.len(), 3);
        assert_eq!(pr.jobs["build"].id, 10);
        assert_eq!(pr.jobs["test"].status, "success");

        // Re-merging identical data is a no-op
        assert_eq!(pr.merge_jobs(vec![job(21, "lint", "success")]), 0);
    }
}
