pub mod patch;
pub mod transport;
pub mod types;

pub use transport::{FakeRequest, GithubRequest, Request, TransportError};
pub use types::{ComparisonSummary, Coordinates, FileChanges, Status};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to parse comparison response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed comparison response at {path}: {reason}")]
    Structural { path: String, reason: String },

    #[error("Invalid {0} reference: must not be empty")]
    InvalidRef(&'static str),

    #[error("Invalid repository {0:?}: expected owner/repo")]
    InvalidRepo(String),

    #[error("Failed to build request path: {0}")]
    RequestPath(String),
}

impl CompareError {
    pub(crate) fn structural(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CompareError::Structural {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Comparison of two commit references in one repository.
///
/// The document is fetched lazily on first access and kept for the lifetime
/// of the instance. Concurrent first accesses on a shared instance wait on
/// the same fetch, so at most one request succeeds per instance; a failed
/// fetch is not cached and the next access tries again.
pub struct CommitsComparison<R: Request> {
    request: R,
    coords: Coordinates,
    base: String,
    head: String,
    path: String,
    document: OnceCell<Map<String, Value>>,
}

impl<R: Request> CommitsComparison<R> {
    /// Only emptiness of the references is checked here. Anything GitHub
    /// can't resolve surfaces as a transport error once the request runs.
    pub fn new(request: R, coords: Coordinates, base: &str, head: &str) -> Result<Self, CompareError> {
        let base = base.trim();
        let head = head.trim();
        if base.is_empty() {
            return Err(CompareError::InvalidRef("base"));
        }
        if head.is_empty() {
            return Err(CompareError::InvalidRef("head"));
        }
        let path = compare_path(&coords, base, head)?;
        Ok(Self {
            request,
            coords,
            base: base.to_string(),
            head: head.to_string(),
            path,
            document: OnceCell::new(),
        })
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coords
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    /// API path of the compare endpoint, relative to the API root and
    /// already percent-encoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw comparison document, exactly as GitHub sent it.
    pub async fn json(&self) -> Result<&Map<String, Value>, CompareError> {
        self.document.get_or_try_init(|| self.fetch()).await
    }

    #[instrument(skip(self), fields(repo = %self.coords, base = %self.base, head = %self.head))]
    async fn fetch(&self) -> Result<Map<String, Value>, CompareError> {
        debug!(path = %self.path, "fetching comparison");
        let body = self.request.get(&self.path).await?;
        debug!(body_bytes = body.len(), "received comparison");

        match serde_json::from_str::<Value>(&body)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(CompareError::structural("$", "expected a JSON object")),
        }
    }

    /// The `base_commit` object. Its shape belongs to GitHub's commit model
    /// and is handed back untouched.
    pub async fn base_commit(&self) -> Result<&Map<String, Value>, CompareError> {
        self.json()
            .await?
            .get("base_commit")
            .and_then(Value::as_object)
            .ok_or_else(|| CompareError::structural("base_commit", "expected an object"))
    }

    /// The `commits` array, in payload order.
    pub async fn commits(&self) -> Result<&[Value], CompareError> {
        self.json()
            .await?
            .get("commits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| CompareError::structural("commits", "expected an array"))
    }

    /// Typed view over the `files` array, in payload order.
    pub async fn files(&self) -> Result<FileChanges<'_>, CompareError> {
        let entries = self
            .json()
            .await?
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| CompareError::structural("files", "expected an array"))?;
        Ok(FileChanges::new(entries))
    }

    pub async fn summary(&self) -> Result<ComparisonSummary, CompareError> {
        ComparisonSummary::from_json(self.json().await?)
    }
}

/// Any API root works here; only the encoded path is kept.
const SEGMENT_ROOT: &str = "https://api.github.com/";

/// `repos/{owner}/{repo}/compare/{base}...{head}` with every segment
/// percent-encoded, so `#`, `?`, `%` and spaces in a ref stay in the path.
/// Slashes in branch names are kept as separators.
fn compare_path(coords: &Coordinates, base: &str, head: &str) -> Result<String, CompareError> {
    let mut url =
        reqwest::Url::parse(SEGMENT_ROOT).map_err(|e| CompareError::RequestPath(e.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| CompareError::RequestPath(SEGMENT_ROOT.to_string()))?;
        segments
            .pop_if_empty()
            .extend(["repos", coords.owner.as_str(), coords.repo.as_str(), "compare"]);
        segments.extend(format!("{}...{}", base, head).split('/'));
    }
    Ok(url.path().trim_start_matches('/').to_string())
}
