use log::debug;

use super::{FetchResult, GitLabClient};
use crate::error::FetchError;
use crate::providers::gitlab::types::GitLabProject;

impl GitLabClient {
    /// Looks a project up by its full path (`group/subgroup/repo`).
    pub async fn get_project(&self, name: &str) -> FetchResult<GitLabProject> {
        let url = self.project_url(name, "")?;

        match self.get_json::<GitLabProject>(url, "get project").await {
            Ok((project, _)) => {
                debug!("Resolved project {name} to id {}", project.id);
                Ok(project)
            }
            Err(FetchError::Api { status: 404, .. }) => {
                Err(FetchError::ProjectNotFound(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
