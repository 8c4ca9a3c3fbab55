use super::{FetchResult, GitLabClient};
use crate::providers::gitlab::types::{GitLabBranch, GitLabTag};

impl GitLabClient {
    /// Names of every branch of the project, all pages included.
    pub async fn list_branches(&self, project_id: u64) -> FetchResult<Vec<String>> {
        let url = self.project_url(&project_id.to_string(), "repository/branches")?;
        let branches: Vec<GitLabBranch> = self.get_paginated(url, None, "list branches").await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    /// Names of every tag of the project, all pages included.
    pub async fn list_tags(&self, project_id: u64) -> FetchResult<Vec<String>> {
        let url = self.project_url(&project_id.to_string(), "repository/tags")?;
        let tags: Vec<GitLabTag> = self.get_paginated(url, None, "list tags").await?;
        Ok(tags.into_iter().map(|t| t.name).collect())
    }
}
