use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;

use super::{Exporter, Task};
use crate::error::Result;
use crate::providers::gitlab::GitLabPipeline;
use crate::schemas::{Project, ProjectRef, ProjectRefKey, ProjectRefKind};

/// Refs selected by a discovery pass: ref name to kind, in discovery order.
pub type DiscoveredRefs = IndexMap<String, ProjectRefKind>;

/// Selects the refs to track out of `candidates`.
///
/// Branches and tags are kept when `refs_regex` matches their name (unanchored
/// unless the pattern is). Merge-request refs are always kept. When a name is
/// offered more than once the first offer wins, so with branches listed before
/// tags a name that is both stays a branch.
pub fn match_refs<I>(candidates: I, refs_regex: &Regex) -> DiscoveredRefs
where
    I: IntoIterator<Item = (String, ProjectRefKind)>,
{
    let mut found = DiscoveredRefs::new();
    for (name, kind) in candidates {
        if kind != ProjectRefKind::MergeRequest && !refs_regex.is_match(&name) {
            continue;
        }
        found.entry(name).or_insert(kind);
    }
    found
}

/// Distinct refs of `pipelines`, keeping the first (most recent) occurrence of each.
pub fn distinct_pipeline_refs(pipelines: &[GitLabPipeline]) -> Vec<&str> {
    let mut seen = HashSet::new();
    pipelines
        .iter()
        .map(|p| p.ref_.as_str())
        .filter(|ref_| seen.insert(*ref_))
        .collect()
}

impl Exporter {
    /// Lists branches, tags and (optionally) merge-request pipeline refs of a
    /// project and selects the ones to track.
    ///
    /// The listings run concurrently; if any of them fails the whole call
    /// fails and nothing is returned.
    pub async fn get_project_refs(
        &self,
        project_id: u64,
        refs_regex: &Regex,
        fetch_merge_requests_refs: bool,
        merge_requests_depth: usize,
    ) -> Result<DiscoveredRefs> {
        let merge_requests_pipelines = async {
            if fetch_merge_requests_refs {
                self.client
                    .list_pipelines(project_id, None, merge_requests_depth)
                    .await
            } else {
                Ok(Vec::new())
            }
        };

        let (branches, tags, pipelines) = tokio::try_join!(
            self.client.list_branches(project_id),
            self.client.list_tags(project_id),
            merge_requests_pipelines,
        )?;

        let merge_requests = distinct_pipeline_refs(&pipelines)
            .into_iter()
            .filter(|ref_| ProjectRefKind::from_pipeline_ref(ref_) == ProjectRefKind::MergeRequest)
            .map(|ref_| (ref_.to_string(), ProjectRefKind::MergeRequest))
            .collect::<Vec<_>>();

        let candidates = branches
            .into_iter()
            .map(|name| (name, ProjectRefKind::Branch))
            .chain(tags.into_iter().map(|name| (name, ProjectRefKind::Tag)))
            .chain(merge_requests);

        Ok(match_refs(candidates, refs_regex))
    }

    /// Refs found in the project's most recent pipelines.
    ///
    /// Merge-request refs are always selected. Other refs must match the
    /// project's pattern and are recorded as branches, unless the project
    /// already tracks a tag of that name.
    async fn get_pipelines_refs(
        &self,
        project: &Project,
        project_id: u64,
        refs_regex: &Regex,
    ) -> Result<DiscoveredRefs> {
        let pipelines = self
            .client
            .list_pipelines(project_id, None, project.parameters.pipelines_depth)
            .await?;

        let mut found = DiscoveredRefs::new();
        for ref_ in distinct_pipeline_refs(&pipelines) {
            let kind = match ProjectRefKind::from_pipeline_ref(ref_) {
                ProjectRefKind::MergeRequest => ProjectRefKind::MergeRequest,
                _ if !refs_regex.is_match(ref_) => continue,
                _ => {
                    let tag_key = ProjectRefKey::new(&project.name, ProjectRefKind::Tag, ref_);
                    if self.store.exists(&tag_key)? {
                        ProjectRefKind::Tag
                    } else {
                        ProjectRefKind::Branch
                    }
                }
            };
            found.insert(ref_.to_string(), kind);
        }
        Ok(found)
    }

    /// Inserts refs the store does not know yet and requests a job pull for
    /// each of them. Known refs are left untouched.
    fn merge_project_refs(
        &self,
        project: &Project,
        project_id: u64,
        refs: &DiscoveredRefs,
    ) -> Result<usize> {
        let mut inserted = 0;
        for (ref_, kind) in refs {
            let project_ref = ProjectRef::new(project.clone(), *kind, project_id, ref_.clone());
            let key = project_ref.key();
            if self.store.set_if_absent(&key, project_ref)? {
                info!(
                    "Discovered new {kind} ref '{ref_}' for project {} (key {key})",
                    project.name
                );
                self.queue.enqueue(Task::PullProjectRefJobs(key));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Discovers the project's branches and tags and starts tracking the new ones.
    ///
    /// Idempotent: refs already tracked keep their accumulated jobs. On failure
    /// the store is not modified.
    pub async fn pull_project_refs_from_project(&self, project: &Project) -> Result<()> {
        let refs_regex = project.parameters.refs_regex()?;
        let lock = self.project_lock(&project.name);
        let _guard = lock.lock().await;

        let project_id = self.resolve_project_id(project).await?;
        let refs = self
            .get_project_refs(project_id, &refs_regex, false, 0)
            .await?;

        let inserted = self.merge_project_refs(project, project_id, &refs)?;
        debug!(
            "Pulled {} refs from project {} ({inserted} new)",
            refs.len(),
            project.name
        );
        Ok(())
    }

    /// Discovers refs from the project's recent pipeline history and starts
    /// tracking the new ones.
    pub async fn pull_project_refs_from_pipelines(&self, project: &Project) -> Result<()> {
        let refs_regex = project.parameters.refs_regex()?;
        let lock = self.project_lock(&project.name);
        let _guard = lock.lock().await;

        let project_id = self.resolve_project_id(project).await?;
        let refs = self
            .get_pipelines_refs(project, project_id, &refs_regex)
            .await?;

        let inserted = self.merge_project_refs(project, project_id, &refs)?;
        debug!(
            "Pulled {} refs from pipelines of project {} ({inserted} new)",
            refs.len(),
            project.name
        );
        Ok(())
    }

    /// Full discovery over every source enabled for the project, followed by
    /// retirement of the project's tracked refs that were not found again.
    ///
    /// Returns the number of refs inserted and retired.
    pub async fn sync_project_refs(&self, project: &Project) -> Result<(usize, usize)> {
        let params = &project.parameters;
        let refs_regex = params.refs_regex()?;
        let lock = self.project_lock(&project.name);
        let _guard = lock.lock().await;

        let project_id = self.resolve_project_id(project).await?;
        let mut refs = self
            .get_project_refs(
                project_id,
                &refs_regex,
                params.fetch_merge_requests_refs,
                params.merge_requests_depth,
            )
            .await?;

        if params.fetch_pipelines_refs {
            let pipelines_refs = self
                .get_pipelines_refs(project, project_id, &refs_regex)
                .await?;
            for (ref_, kind) in pipelines_refs {
                refs.entry(ref_).or_insert(kind);
            }
        }

        let selected: HashSet<ProjectRefKey> = refs
            .iter()
            .map(|(ref_, kind)| ProjectRefKey::new(&project.name, *kind, ref_))
            .collect();

        let inserted = self.merge_project_refs(project, project_id, &refs)?;

        let mut retired = 0;
        for (key, project_ref) in self.store.project_refs(&project.name)? {
            if selected.contains(&key) {
                continue;
            }
            if self.store.delete(&key)? {
                info!(
                    "Retired {} ref '{}' of project {} (key {key})",
                    project_ref.kind, project_ref.ref_, project.name
                );
                retired += 1;
            }
        }

        Ok((inserted, retired))
    }

    /// Stops tracking refs of projects that are no longer configured.
    pub fn retire_unconfigured_projects(&self, projects: &[Project]) -> Result<usize> {
        let configured: HashSet<&str> = projects.iter().map(|p| p.name.as_str()).collect();

        let mut retired = 0;
        for (key, project_ref) in self.store.projects_refs()? {
            if configured.contains(project_ref.project.name.as_str()) {
                continue;
            }
            if self.store.delete(&key)? {
                info!(
                    "Retired {} ref '{}' of unconfigured project {}",
                    project_ref.kind, project_ref.ref_, project_ref.project.name
                );
                retired += 1;
            }
        }
        Ok(retired)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::schemas::{Job, ProjectParameters, ProjectsRefs};
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn regex(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn job(id: u64, name: &str) -> Job {
        Job {
            id,
            name: name.to_string(),
            stage: "test".to_string(),
            status: "success".to_string(),
            duration: Some(3.0),
            queued_duration: None,
            created_at: None,
            started_at: None,
            finished_at: None,
            pipeline: None,
        }
    }

    fn expected_main_branch() -> ProjectsRefs {
        let project_ref = ProjectRef {
            project: Project::new("foo/bar"),
            kind: ProjectRefKind::Branch,
            id: 1,
            ref_: "main".to_string(),
            jobs: HashMap::new(),
        };
        HashMap::from([(
            ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main"),
            project_ref,
        )])
    }

    #[test]
    fn test_match_refs_filters_branches_and_tags_only() {
        let candidates = vec![
            ("keep/dev".to_string(), ProjectRefKind::Branch),
            ("drop/me".to_string(), ProjectRefKind::Branch),
            ("keep/0.0.1".to_string(), ProjectRefKind::Tag),
            ("0.0.2".to_string(), ProjectRefKind::Tag),
            ("refs/merge-requests/4/head".to_string(), ProjectRefKind::MergeRequest),
        ];

        let found = match_refs(candidates, &regex("^keep"));

        assert_eq!(found.len(), 3);
        assert_eq!(found["keep/dev"], ProjectRefKind::Branch);
        assert_eq!(found["keep/0.0.1"], ProjectRefKind::Tag);
        assert_eq!(found["refs/merge-requests/4/head"], ProjectRefKind::MergeRequest);
    }

    #[test]
    fn test_match_refs_first_offer_wins() {
        let candidates = vec![
            ("release".to_string(), ProjectRefKind::Branch),
            ("release".to_string(), ProjectRefKind::Tag),
        ];
        let found = match_refs(candidates, &regex("release"));
        assert_eq!(found["release"], ProjectRefKind::Branch);
    }

    #[test]
    fn test_distinct_pipeline_refs_keeps_most_recent_first() {
        let pipelines: Vec<GitLabPipeline> = serde_json::from_str(
            r#"[{"id":5,"ref":"main"},{"id":4,"ref":"dev"},{"id":3,"ref":"main"}]"#,
        )
        .unwrap();
        assert_eq!(distinct_pipeline_refs(&pipelines), vec!["main", "dev"]);
    }

    #[tokio::test]
    async fn test_get_project_refs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"keep/dev"},{"name":"keep/main"}]"#,
        )
        .await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/tags",
            r#"[{"name":"keep/dev"},{"name":"keep/0.0.2"}]"#,
        )
        .await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/pipelines",
            r#"[{"id":1,"ref":"refs/merge-requests/foo"}]"#,
        )
        .await;

        let (exporter, _rx) = exporter(&server);
        let found = exporter
            .get_project_refs(1, &regex("^keep"), true, 10)
            .await
            .unwrap();

        let expected = DiscoveredRefs::from([
            ("keep/0.0.2".to_string(), ProjectRefKind::Tag),
            ("keep/dev".to_string(), ProjectRefKind::Branch),
            ("keep/main".to_string(), ProjectRefKind::Branch),
            ("refs/merge-requests/foo".to_string(), ProjectRefKind::MergeRequest),
        ]);
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_get_project_refs_fails_if_any_listing_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"}]"#,
        )
        .await;
        let _mock = mock_status(&mut server, "/api/v4/projects/1/repository/tags", 429).await;

        let (exporter, _rx) = exporter(&server);
        let err = exporter
            .get_project_refs(1, &regex(".*"), false, 0)
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_pull_project_refs_from_project() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"},{"name":"nope"}]"#,
        )
        .await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/repository/tags", "[]").await;

        let (exporter, mut rx) = exporter(&server);
        assert_ok!(
            exporter
                .pull_project_refs_from_project(&Project::new("foo/bar"))
                .await
        );

        assert_eq!(exporter.store().projects_refs().unwrap(), expected_main_branch());

        // The new ref got a job pull requested
        let key = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");
        assert_eq!(rx.try_recv().unwrap(), Task::PullProjectRefJobs(key));
    }

    #[tokio::test]
    async fn test_pull_project_refs_from_project_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"}]"#,
        )
        .await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/repository/tags", "[]").await;

        let (exporter, mut rx) = exporter(&server);
        let project = Project::new("foo/bar");
        let key = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");

        assert_ok!(exporter.pull_project_refs_from_project(&project).await);
        exporter
            .store()
            .update(&key, |pr| {
                pr.merge_jobs(vec![job(9, "build")]);
            })
            .unwrap();
        let before = exporter.store().projects_refs().unwrap();

        assert_ok!(exporter.pull_project_refs_from_project(&project).await);

        assert_eq!(exporter.store().projects_refs().unwrap(), before);
        assert_eq!(before[&key].jobs["build"].id, 9);
        // Only the first pass asked for a job pull
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pull_project_refs_from_pipelines() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/pipelines",
            r#"[{"id":1,"ref":"main"}]"#,
        )
        .await;

        let (exporter, _rx) = exporter(&server);
        assert_ok!(
            exporter
                .pull_project_refs_from_pipelines(&Project::new("foo/bar"))
                .await
        );

        assert_eq!(exporter.store().projects_refs().unwrap(), expected_main_branch());
    }

    #[tokio::test]
    async fn test_pull_project_refs_from_pipelines_classifies_refs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/pipelines",
            r#"[
                {"id":6,"ref":"refs/merge-requests/3/head"},
                {"id":5,"ref":"v1.0.0"},
                {"id":4,"ref":"feature/x"},
                {"id":3,"ref":"main"}
            ]"#,
        )
        .await;

        let (exporter, _rx) = exporter(&server);
        let project = Project::with_parameters(
            "foo/bar",
            ProjectParameters {
                refs_regexp: "^(main|v.*)$".to_string(),
                ..ProjectParameters::default()
            },
        );

        // v1.0.0 is already tracked as a tag
        let tag = ProjectRef::new(project.clone(), ProjectRefKind::Tag, 1, "v1.0.0");
        exporter.store().set(&tag.key(), tag).unwrap();

        assert_ok!(exporter.pull_project_refs_from_pipelines(&project).await);

        let refs = exporter.store().projects_refs().unwrap();
        let mut found: Vec<(ProjectRefKind, String)> =
            refs.values().map(|pr| (pr.kind, pr.ref_.clone())).collect();
        found.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            found,
            vec![
                (ProjectRefKind::Branch, "main".to_string()),
                (
                    ProjectRefKind::MergeRequest,
                    "refs/merge-requests/3/head".to_string()
                ),
                (ProjectRefKind::Tag, "v1.0.0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_pull_leaves_store_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"},{"name":"master"}]"#,
        )
        .await;
        let _mock = mock_status(&mut server, "/api/v4/projects/1/repository/tags", 500).await;

        let (exporter, mut rx) = exporter(&server);
        let existing = ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Branch, 1, "old");
        exporter.store().set(&existing.key(), existing).unwrap();
        let before = exporter.store().projects_refs().unwrap();

        let project = Project::new("foo/bar");
        assert_err!(exporter.pull_project_refs_from_project(&project).await);
        assert_err!(exporter.sync_project_refs(&project).await);

        assert_eq!(exporter.store().projects_refs().unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    fn seed_existing_ref(exporter: &Exporter) -> ProjectsRefs {
        let mut existing =
            ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Branch, 1, "old");
        existing.merge_jobs(vec![job(1, "build")]);
        exporter.store().set(&existing.key(), existing).unwrap();
        exporter.store().projects_refs().unwrap()
    }

    #[tokio::test]
    async fn test_failed_branch_listing_leaves_store_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock =
            mock_status(&mut server, "/api/v4/projects/1/repository/branches", 503).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/tags",
            r#"[{"name":"main"}]"#,
        )
        .await;

        let (exporter, mut rx) = exporter(&server);
        let before = seed_existing_ref(&exporter);

        let project = Project::new("foo/bar");
        let err = exporter
            .pull_project_refs_from_project(&project)
            .await
            .unwrap_err();
        assert!(err.is_fetch());
        assert_err!(exporter.sync_project_refs(&project).await);

        assert_eq!(exporter.store().projects_refs().unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_pipeline_listing_leaves_store_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"},{"name":"master"}]"#,
        )
        .await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/repository/tags", "[]").await;
        let _mock = mock_status(&mut server, "/api/v4/projects/1/pipelines", 502).await;

        let (exporter, mut rx) = exporter(&server);
        let before = seed_existing_ref(&exporter);

        let with_pipelines = Project::with_parameters(
            "foo/bar",
            ProjectParameters {
                fetch_pipelines_refs: true,
                ..ProjectParameters::default()
            },
        );
        let with_merge_requests = Project::with_parameters(
            "foo/bar",
            ProjectParameters {
                fetch_merge_requests_refs: true,
                ..ProjectParameters::default()
            },
        );

        assert_err!(
            exporter
                .pull_project_refs_from_pipelines(&with_pipelines)
                .await
        );
        // Branches were listed fine, yet neither sync inserts them nor retires "old"
        assert_err!(exporter.sync_project_refs(&with_pipelines).await);
        assert_err!(exporter.sync_project_refs(&with_merge_requests).await);

        assert_eq!(exporter.store().projects_refs().unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_project_lookup_leaves_store_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_status(&mut server, "/api/v4/projects/foo%2Fbar", 404).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"}]"#,
        )
        .await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/repository/tags", "[]").await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/pipelines",
            r#"[{"id":1,"ref":"main"}]"#,
        )
        .await;

        let (exporter, mut rx) = exporter(&server);
        let before = seed_existing_ref(&exporter);
        let project = Project::new("foo/bar");

        let err = exporter
            .pull_project_refs_from_project(&project)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::RefscoutError::Fetch(crate::error::FetchError::ProjectNotFound(_))
        ));
        assert_err!(exporter.pull_project_refs_from_pipelines(&project).await);
        assert_err!(exporter.sync_project_refs(&project).await);

        assert_eq!(exporter.store().projects_refs().unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_regexp_fails_before_any_request() {
        let server = mockito::Server::new_async().await;
        let (exporter, _rx) = exporter(&server);
        let project = Project::with_parameters(
            "foo/bar",
            ProjectParameters {
                refs_regexp: "(".to_string(),
                ..ProjectParameters::default()
            },
        );

        let err = exporter
            .pull_project_refs_from_project(&project)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::RefscoutError::Config(_)));
    }

    #[tokio::test]
    async fn test_sync_project_refs_retires_unselected_refs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/foo%2Fbar", r#"{"id":1}"#).await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/repository/branches",
            r#"[{"name":"main"}]"#,
        )
        .await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/repository/tags", "[]").await;

        let (exporter, _rx) = exporter(&server);
        let project = Project::new("foo/bar");

        let mut main = ProjectRef::new(project.clone(), ProjectRefKind::Branch, 1, "main");
        main.merge_jobs(vec![job(1, "build")]);
        let gone = ProjectRef::new(project.clone(), ProjectRefKind::Branch, 1, "master");
        let other = ProjectRef::new(Project::new("foo/other"), ProjectRefKind::Branch, 2, "master");
        for pr in [main, gone.clone(), other.clone()] {
            exporter.store().set(&pr.key(), pr).unwrap();
        }

        let (inserted, retired) = exporter.sync_project_refs(&project).await.unwrap();
        assert_eq!((inserted, retired), (0, 1));

        let store = exporter.store();
        assert!(!store.exists(&gone.key()).unwrap());
        assert!(store.exists(&other.key()).unwrap());
        let main_key = ProjectRefKey::new("foo/bar", ProjectRefKind::Branch, "main");
        assert_eq!(store.get(&main_key).unwrap().unwrap().jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_retire_unconfigured_projects() {
        let server = mockito::Server::new_async().await;
        let (exporter, _rx) = exporter(&server);

        let kept = ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Branch, 1, "main");
        let dropped = ProjectRef::new(Project::new("foo/old"), ProjectRefKind::Tag, 2, "v1");
        for pr in [kept.clone(), dropped] {
            exporter.store().set(&pr.key(), pr).unwrap();
        }

        let retired = exporter
            .retire_unconfigured_projects(&[Project::new("foo/bar")])
            .unwrap();

        assert_eq!(retired, 1);
        assert_eq!(exporter.store().keys().unwrap(), vec![kept.key()]);
    }
}
