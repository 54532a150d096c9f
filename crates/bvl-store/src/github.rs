//! GitHub repository contents as a blob store.
//!
//! Keys are file paths in the repository. Reads use
//! `GET /repos/{repo}/contents/{path}`, writes use
//! `PUT /repos/{repo}/contents/{path}`; every write is a commit.
//!
//! The blob SHA returned by the API is the [`VersionToken`]. Updates pass it
//! back as `sha`, so the API itself performs the compare-and-swap:
//!
//! | situation                              | response | result      |
//! |----------------------------------------|----------|-------------|
//! | `sha` matches                          | 200      | new token   |
//! | file absent, no `sha`                  | 201      | new token   |
//! | `sha` is stale                         | 409      | `Conflict`  |
//! | file exists, no `sha` supplied         | 422      | `Conflict`  |

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bvl_types::VersionToken;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobStore, StoredBlob};

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Connection settings for [`GithubContentsStore`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubStoreConfig {
    /// REST API base URL.
    pub api_url: String,
    /// `owner/name` of the repository holding the version files.
    pub repository: String,
    /// Pre-issued access token, sent as `Authorization: token ...`.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Branch to read from and commit to; the default branch when unset.
    pub branch: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl GithubStoreConfig {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }
}

impl Default for GithubStoreConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            repository: String::new(),
            token: None,
            branch: None,
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for GithubStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubStoreConfig")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("branch", &self.branch)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// A [`BlobStore`] over the GitHub repository contents API.
pub struct GithubContentsStore {
    config: GithubStoreConfig,
    client: Client,
}

#[derive(Deserialize)]
struct ContentFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: ContentFile,
}

impl GithubContentsStore {
    pub fn new(config: GithubStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("bvl/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GithubStoreConfig {
        &self.config
    }

    /// `{api}/repos/{owner}/{name}/contents/{key...}` with each segment
    /// percent-encoded.
    pub fn contents_url(&self, key: &str) -> StoreResult<Url> {
        let mut url = Url::parse(&self.config.api_url).map_err(|e| StoreError::InvalidKey {
            key: key.to_string(),
            reason: format!("bad API URL {}: {e}", self.config.api_url),
        })?;

        if key.is_empty() || key.split('/').any(|s| s.is_empty() || s == "..") {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: "key must be a relative path without empty or '..' segments".into(),
            });
        }

        {
            let mut segments = url.path_segments_mut().map_err(|_| StoreError::InvalidKey {
                key: key.to_string(),
                reason: format!("API URL cannot be a base: {}", self.config.api_url),
            })?;
            segments.pop_if_empty();
            segments.push("repos");
            segments.extend(self.config.repository.split('/'));
            segments.push("contents");
            segments.extend(key.split('/'));
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::blocking::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, ACCEPT);
        match &self.config.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
            None => builder,
        }
    }
}

impl BlobStore for GithubContentsStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        let mut url = self.contents_url(key)?;
        if let Some(branch) = &self.config.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        debug!(%url, "fetching contents");
        let response = self
            .request(reqwest::Method::GET, url.clone())
            .send()
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => {
                let file: ContentFile = response.json().map_err(|e| decode_error(key, e))?;
                decode_content(key, file).map(Some)
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(http_error(url, response)),
        }
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let url = self.contents_url(key)?;
        let body = PutRequest {
            message: format!("Update {key}"),
            content: STANDARD.encode(data),
            sha: expected.map(VersionToken::as_str),
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .request(reqwest::Method::PUT, url.clone())
            .json(&body)
            .send()
            .map_err(transport)?;

        let status = response.status();
        if is_conflict_status(status, expected.is_some()) {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: expected.cloned(),
                actual: None,
            });
        }
        if !status.is_success() {
            return Err(http_error(url, response));
        }

        let put: PutResponse = response.json().map_err(|e| decode_error(key, e))?;
        let token = VersionToken::new(put.content.sha);
        info!(key, token = token.short(), "committed version file");
        Ok(token)
    }
}

/// A conditional write lost if the API reports a stale `sha` (409), or if a
/// create (no `sha`) found the file already present (422).
fn is_conflict_status(status: StatusCode, had_expected: bool) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::UNPROCESSABLE_ENTITY && !had_expected)
}

fn decode_content(key: &str, file: ContentFile) -> StoreResult<StoredBlob> {
    match file.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(StoreError::Decode {
                key: key.to_string(),
                reason: format!("unsupported content encoding {other:?}"),
            });
        }
    }

    // The API wraps base64 payloads at 60 columns.
    let packed: String = file
        .content
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let data = STANDARD.decode(packed).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    Ok(StoredBlob {
        data,
        token: VersionToken::new(file.sha),
    })
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

fn decode_error(key: &str, e: reqwest::Error) -> StoreError {
    StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

fn http_error(url: Url, response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    StoreError::Http {
        status,
        url: url.to_string(),
        body,
    }
}
