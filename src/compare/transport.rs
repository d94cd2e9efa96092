use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request could not be served: {0}")]
    Unavailable(String),
}

/// Capability to issue a GET against the GitHub API and hand back the body.
///
/// Paths are relative to the API root, e.g. `repos/octo/hello/compare/a...b`.
#[async_trait]
pub trait Request: Send + Sync {
    async fn get(&self, path: &str) -> Result<String, TransportError>;
}

/// Real transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct GithubRequest {
    client: reqwest::Client,
    api_url: String,
    user_agent: String,
    token: Option<String>,
}

impl GithubRequest {
    pub fn new(api_url: &str, user_agent: &str, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, user_agent, token)
    }

    pub fn with_client(
        client: reqwest::Client,
        api_url: &str,
        user_agent: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            token,
        }
    }

    /// `path` must already be percent-encoded.
    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Request for GithubRequest {
    #[instrument(skip(self), fields(api = %self.api_url))]
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        let url = self.url_for(path);
        debug!(%url, authenticated = self.token.is_some(), "sending GET");

        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(body_bytes = body.len(), "received response");
        Ok(body)
    }
}

/// In-memory responder: serves one canned outcome for every path and
/// remembers what was asked for.
#[derive(Debug, Default)]
pub struct FakeRequest {
    body: String,
    failure: Option<String>,
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

impl FakeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Every call fails with `TransportError::Unavailable(reason)`.
    #[cfg(test)]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn paths(&self) -> Vec<String> {
        self.paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Request for FakeRequest {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_string());
        }
        match &self.failure {
            Some(reason) => Err(TransportError::Unavailable(reason.clone())),
            None => Ok(self.body.clone()),
        }
    }
}
