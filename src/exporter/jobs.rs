use log::{debug, info};

use super::Exporter;
use crate::error::Result;
use crate::schemas::ProjectRefKey;

impl Exporter {
    /// Refreshes the job snapshot of a tracked ref from its most recent pipeline.
    ///
    /// Jobs are merged into the stored record; nothing is removed. Returns the
    /// number of jobs added or updated. A ref that is not (or no longer)
    /// tracked is skipped.
    pub async fn pull_project_ref_jobs(&self, key: &ProjectRefKey) -> Result<usize> {
        let Some(project_ref) = self.store.get(key)? else {
            debug!("Project ref {key} is not tracked anymore, skipping job pull");
            return Ok(0);
        };

        let pipelines = self
            .client
            .list_pipelines(project_ref.id, Some(project_ref.ref_.as_str()), 1)
            .await?;
        let Some(pipeline) = pipelines.first() else {
            debug!(
                "No pipeline found for {} ref '{}' of project {}",
                project_ref.kind, project_ref.ref_, project_ref.project.name
            );
            return Ok(0);
        };

        let jobs = self
            .client
            .list_pipeline_jobs(project_ref.id, pipeline.id)
            .await?;

        let mut changed = 0;
        let tracked = self.store.update(key, |stored| {
            changed = stored.merge_jobs(jobs);
        })?;

        if !tracked {
            debug!("Project ref {key} was retired during its job pull");
            return Ok(0);
        }

        if changed > 0 {
            info!(
                "Updated {changed} jobs of {} ref '{}' of project {} from pipeline {}",
                project_ref.kind, project_ref.ref_, project_ref.project.name, pipeline.id
            );
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::schemas::{Project, ProjectRef, ProjectRefKind};
    use mockito::Matcher;

    fn tracked_main(exporter: &super::Exporter) -> crate::schemas::ProjectRefKey {
        let pr = ProjectRef::new(Project::new("foo/bar"), ProjectRefKind::Branch, 1, "main");
        let key = pr.key();
        exporter.store().set(&key, pr).unwrap();
        key
    }

    #[tokio::test]
    async fn test_pull_project_ref_jobs_merges_latest_pipeline_jobs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", endpoint("/api/v4/projects/1/pipelines"))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ref".into(), "main".into()),
                Matcher::UrlEncoded("per_page".into(), "1".into()),
            ]))
            .with_body(r#"[{"id":12,"ref":"main"}]"#)
            .create_async()
            .await;
        let _mock = mock_json(
            &mut server,
            "/api/v4/projects/1/pipelines/12/jobs",
            r#"[
                {"id":100,"name":"build","stage":"build","status":"success"},
                {"id":101,"name":"test","stage":"test","status":"failed"}
            ]"#,
        )
        .await;

        let (exporter, _rx) = exporter(&server);
        let key = tracked_main(&exporter);

        assert_eq!(exporter.pull_project_ref_jobs(&key).await.unwrap(), 2);
        let stored = exporter.store().get(&key).unwrap().unwrap();
        assert_eq!(stored.jobs["test"].status, "failed");

        // Same pipeline again: nothing new
        assert_eq!(exporter.pull_project_ref_jobs(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pull_project_ref_jobs_without_pipeline() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/pipelines", "[]").await;

        let (exporter, _rx) = exporter(&server);
        let key = tracked_main(&exporter);

        assert_eq!(exporter.pull_project_ref_jobs(&key).await.unwrap(), 0);
        assert!(exporter.store().get(&key).unwrap().unwrap().jobs.is_empty());
    }

    #[tokio::test]
    async fn test_pull_project_ref_jobs_for_untracked_key() {
        let server = mockito::Server::new_async().await;
        let (exporter, _rx) = exporter(&server);
        let key = crate::schemas::ProjectRefKey::new("foo/bar", ProjectRefKind::Tag, "v1");

        assert_eq!(exporter.pull_project_ref_jobs(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_pull_keeps_previous_jobs() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_json(&mut server, "/api/v4/projects/1/pipelines", r#"[{"id":12,"ref":"main"}]"#).await;
        let _mock = mock_status(&mut server, "/api/v4/projects/1/pipelines/12/jobs", 503).await;

        let (exporter, _rx) = exporter(&server);
        let key = tracked_main(&exporter);
        let before = exporter.store().get(&key).unwrap();

        assert!(exporter.pull_project_ref_jobs(&key).await.unwrap_err().is_fetch());
        assert_eq!(exporter.store().get(&key).unwrap(), before);
    }
}
