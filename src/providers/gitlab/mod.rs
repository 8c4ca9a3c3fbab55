mod client;
mod types;

pub use client::{FetchResult, GitLabClient};
pub use types::{GitLabBranch, GitLabPipeline, GitLabProject, GitLabTag};
