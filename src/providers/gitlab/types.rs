//! Payloads of the GitLab REST v4 endpoints used for ref discovery.
//!
//! Only the fields discovery needs are decoded; everything else is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    #[serde(default)]
    pub path_with_namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabBranch {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabTag {
    pub name: String,
}

/// Pipeline summary, as returned by `GET /projects/:id/pipelines`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabPipeline {
    pub id: u64,
    /// Git ref the pipeline ran on, e.g. `main` or `refs/merge-requests/12/head`
    #[serde(rename = "ref")]
    pub ref_: String,
    #[serde(default)]
    pub status: Option<String>,
}
