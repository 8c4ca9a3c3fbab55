use thiserror::Error;

/// Failures talking to the GitLab API.
///
/// Any of these aborts the discovery pass that triggered it; the store is left
/// exactly as it was before the pass started.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitLab API request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GitLab API rate limit exceeded (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("{operation} timed out")]
    Timeout { operation: String },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed API response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RefscoutError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Store consistency violated: {0}")]
    StoreConsistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefscoutError {
    /// True when the error came from the upstream API and a later retry may succeed.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

impl From<reqwest::Error> for RefscoutError {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch(FetchError::Network(e))
    }
}

pub type Result<T> = std::result::Result<T, RefscoutError>;
