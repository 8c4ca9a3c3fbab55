use super::{FetchResult, GitLabClient};
use crate::providers::gitlab::types::GitLabPipeline;
use crate::schemas::Job;

impl GitLabClient {
    /// Most recent pipelines of the project, newest first, capped at `limit`.
    ///
    /// When `ref_` is set only pipelines that ran on that ref are returned.
    pub async fn list_pipelines(
        &self,
        project_id: u64,
        ref_: Option<&str>,
        limit: usize,
    ) -> FetchResult<Vec<GitLabPipeline>> {
        let mut url = self.project_url(&project_id.to_string(), "pipelines")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("order_by", "id").append_pair("sort", "desc");
            if let Some(ref_) = ref_ {
                query.append_pair("ref", ref_);
            }
        }

        self.get_paginated(url, Some(limit), "list pipelines").await
    }

    /// Every job of a pipeline, all pages included.
    pub async fn list_pipeline_jobs(
        &self,
        project_id: u64,
        pipeline_id: u64,
    ) -> FetchResult<Vec<Job>> {
        let url = self.project_url(
            &project_id.to_string(),
            &format!("pipelines/{pipeline_id}/jobs"),
        )?;
        self.get_paginated(url, None, "list pipeline jobs").await
    }
}
