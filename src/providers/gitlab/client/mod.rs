mod pipelines;
mod projects;
mod repository;

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use crate::auth::Token;
use crate::error::{FetchError, RefscoutError, Result};

pub(super) const PAGE_SIZE: usize = 100;
const NEXT_PAGE_HEADER: &str = "x-next-page";

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Thin GitLab REST v4 client.
///
/// Listing calls walk every page before returning. Failures are surfaced as
/// [`FetchError`] and never retried here: retry policy belongs to the caller.
#[derive(Debug)]
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
}

impl GitLabClient {
    /// Creates a client for the GitLab instance at `base_url`.
    ///
    /// Every request is bounded by `timeout`; at most `max_concurrent_requests`
    /// requests are in flight at once.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<Token>,
        timeout: Duration,
        max_concurrent_requests: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("refscout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RefscoutError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = Url::parse(base_url)
            .map_err(|e| RefscoutError::Config(format!("Invalid base URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(RefscoutError::Config(format!(
                "Invalid base URL: {base_url}"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_url = base
            .join("api/v4/")
            .map_err(|e| RefscoutError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// URL of `projects/<project>/<path>`, with `project` percent-encoded so that
    /// a full path such as `group/repo` stays a single segment.
    fn project_url(&self, project: &str, path: &str) -> FetchResult<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(project.as_bytes()).collect();
        let url = if path.is_empty() {
            self.api_url.join(&format!("projects/{encoded}"))?
        } else {
            self.api_url.join(&format!("projects/{encoded}/{path}"))?
        };
        Ok(url)
    }

    /// Issues a GET and decodes the JSON body, returning the next page number
    /// advertised by GitLab, if any.
    async fn get_json<T>(&self, url: Url, operation: &str) -> FetchResult<(T, Option<u32>)>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Api {
                status: 0,
                message: "request limiter closed".to_string(),
            })?;

        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url))
            .send()
            .await
            .map_err(|e| classify_transport_error(e, operation))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(FetchError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(e, operation))?;

        Ok((serde_json::from_slice(&body)?, next_page))
    }

    /// Walks `url` page by page until GitLab stops advertising a next page, or
    /// until `limit` items have been collected.
    async fn get_paginated<T>(
        &self,
        url: Url,
        limit: Option<usize>,
        operation: &str,
    ) -> FetchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let per_page = limit.map_or(PAGE_SIZE, |l| l.clamp(1, PAGE_SIZE));
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            if limit.is_some_and(|l| items.len() >= l) {
                break;
            }

            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            let (batch, next_page): (Vec<T>, Option<u32>) =
                self.get_json(page_url, operation).await?;

            let fetched = batch.len();
            items.extend(batch);

            match next_page {
                Some(next) if next > page && fetched > 0 => page = next,
                _ => break,
            }
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }

        Ok(items)
    }
}

fn classify_transport_error(e: reqwest::Error, operation: &str) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            operation: operation.to_string(),
        }
    } else {
        FetchError::Network(e)
    }
}
