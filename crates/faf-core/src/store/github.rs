//! Git-hosting contents API store
//!
//! `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}` returns the file
//! base64-encoded with its blob `sha`; `PUT` on the same URL with the `sha`
//! read earlier creates a commit or fails if the file has moved on.

use super::{validate_relative, CommitRecord, DnaStore, StoreError, StoredDna};
use crate::credentials::CredentialSource;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use faf_dna::VersionToken;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("faf-broker/", env!("CARGO_PKG_VERSION"));

/// Repository coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubTarget {
    /// API base URL, e.g. `https://api.github.com`
    pub api_base: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch to read from and commit to
    pub branch: String,
}

/// Contents-API backed store
#[derive(Debug, Clone)]
pub struct GitHubContentsStore {
    client: Client,
    target: GitHubTarget,
    credentials: Arc<dyn CredentialSource>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
    commit: PutCommit,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutCommit {
    sha: String,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

impl GitHubContentsStore {
    /// Create a store client with a bounded request timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        target: GitHubTarget,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            target,
            credentials,
            timeout,
        })
    }

    /// Repository coordinates
    #[inline]
    #[must_use]
    pub fn target(&self) -> &GitHubTarget {
        &self.target
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.target.api_base.trim_end_matches('/'),
            self.target.owner,
            self.target.repo,
            path.trim_start_matches("./"),
        )
    }

    fn transport_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::TimedOut {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            StoreError::Http(err.without_url())
        }
    }

    /// Map a non-success response onto the store taxonomy
    async fn failure(path: &str, response: Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound {
                path: path.to_string(),
            },
            StatusCode::CONFLICT => StoreError::Conflict {
                path: path.to_string(),
                message,
            },
            other => StoreError::Upstream {
                status: other.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl DnaStore for GitHubContentsStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn read(&self, path: &str) -> Result<StoredDna, StoreError> {
        validate_relative(path)?;
        let token = self.credentials.resolve()?;
        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.target.branch.as_str())])
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::failure(path, response).await);
        }

        let body: ContentsResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        if body.encoding.as_deref().is_some_and(|enc| enc != "base64") {
            return Err(StoreError::Decode(format!(
                "unsupported content encoding for {path}"
            )));
        }
        let packed: String = body.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(packed)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(StoredDna {
            content,
            version: VersionToken::new(body.sha),
        })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        expected: &VersionToken,
        message: &str,
    ) -> Result<CommitRecord, StoreError> {
        validate_relative(path)?;
        let token = self.credentials.resolve()?;
        let request = PutContents {
            message,
            content: STANDARD.encode(content),
            sha: expected.as_str(),
            branch: &self.target.branch,
        };
        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::failure(path, response).await);
        }

        let body: PutResponse = response.json().await.map_err(|e| self.transport_error(e))?;
        let url = body.commit.html_url.unwrap_or_else(|| {
            format!(
                "{}/{}/{}/commit/{}",
                self.target.api_base.trim_end_matches('/'),
                self.target.owner,
                self.target.repo,
                body.commit.sha
            )
        });
        tracing::info!(
            owner = %self.target.owner,
            repo = %self.target.repo,
            commit = %body.commit.sha,
            "contents commit created"
        );
        Ok(CommitRecord {
            version: VersionToken::new(body.content.sha),
            message: message.to_string(),
            url,
        })
    }
}
