//! GitHub Gist backup and restore for FrameCheck.
//!
//! The whole project list travels as one JSON document inside a private gist.
//! A push overwrites that document in a single request; a pull parses and
//! migrates the complete list before returning anything.

use std::collections::BTreeMap;
use std::time::Duration;

use backoff::future::retry;
use backoff::{Error as BackoffError, ExponentialBackoff};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use fc_core::{parse_projects, Project};

/// Name of the backup document inside the gist.
pub const GIST_FILENAME: &str = "framecheck-backup.json";
/// Description attached to newly created gists.
pub const GIST_DESCRIPTION: &str = "FrameCheck Canvas Inspector Backup";
/// Public GitHub API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("framecheck/", env!("CARGO_PKG_VERSION"));

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors returned by the backup client.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("GitHub token missing")]
    MissingToken,
    #[error("GitHub token contains characters that cannot be sent in a header")]
    InvalidToken,
    #[error("sync not configured or gist id missing")]
    MissingGistId,
    #[error("http error: {0}")]
    Http(String),
    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("backup file not found in gist")]
    BackupNotFound,
    #[error("invalid backup payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Serialize)]
struct GistPayload<'a> {
    description: &'a str,
    public: bool,
    files: BTreeMap<&'a str, GistFileContent>,
}

#[derive(Debug, Serialize)]
struct GistFileContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct GistResponse {
    id: String,
    #[serde(default)]
    files: BTreeMap<String, Option<GistFile>>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Client for a single GitHub account.
#[derive(Debug, Clone)]
pub struct GistClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
    max_elapsed: Duration,
}

impl GistClient {
    /// Create a client against the public GitHub API.
    pub fn new(token: Option<&str>) -> SyncResult<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Create a client against an explicit API base URL.
    pub fn with_base_url(token: Option<&str>, base_url: &str) -> SyncResult<Self> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SyncError::MissingToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {token}")).map_err(|_| SyncError::InvalidToken)?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| SyncError::Http(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            max_elapsed: Duration::from_secs(30),
        })
    }

    /// Cap the total time spent retrying transient failures.
    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Upload the project list, creating the gist when no id is known yet.
    /// Returns the gist id to remember for later pushes and pulls.
    pub async fn push(&self, projects: &[Project], gist_id: Option<&str>) -> SyncResult<String> {
        let content = serde_json::to_string_pretty(projects)
            .map_err(|err| SyncError::InvalidPayload(err.to_string()))?;
        let mut files = BTreeMap::new();
        files.insert(GIST_FILENAME, GistFileContent { content });
        let payload = GistPayload {
            description: GIST_DESCRIPTION,
            public: false,
            files,
        };

        let gist_id = gist_id.map(str::trim).filter(|id| !id.is_empty());
        let (method, url) = match gist_id {
            Some(id) => (Method::PATCH, format!("{}/gists/{id}", self.base_url)),
            None => (Method::POST, format!("{}/gists", self.base_url)),
        };
        debug!(%method, %url, count = projects.len(), "pushing backup");

        let idempotent = method != Method::POST;
        let response = self
            .execute(idempotent, || {
                self.http
                    .request(method.clone(), &url)
                    .headers(self.headers.clone())
                    .json(&payload)
            })
            .await?;
        info!(gist = %response.id, "backup pushed");
        Ok(response.id)
    }

    /// Download and migrate the project list stored in the gist.
    pub async fn pull(&self, gist_id: Option<&str>) -> SyncResult<Vec<Project>> {
        let gist_id = gist_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::MissingGistId)?;
        let url = format!("{}/gists/{gist_id}", self.base_url);
        debug!(%url, "pulling backup");

        let response = self
            .execute(true, || self.http.get(&url).headers(self.headers.clone()))
            .await?;
        let content = response
            .files
            .get(GIST_FILENAME)
            .and_then(Option::as_ref)
            .and_then(|file| file.content.as_deref())
            .filter(|content| !content.trim().is_empty())
            .ok_or(SyncError::BackupNotFound)?;
        let projects =
            parse_projects(content).map_err(|err| SyncError::InvalidPayload(err.to_string()))?;
        info!(gist = %response.id, count = projects.len(), "backup pulled");
        Ok(projects)
    }

    /// Send a request, retrying transient failures. A request that is not
    /// idempotent is only retried when the connection was never established.
    async fn execute<F>(&self, idempotent: bool, request: F) -> SyncResult<GistResponse>
    where
        F: Fn() -> RequestBuilder,
    {
        let operation = || {
            let builder = request();
            async move {
                let response = builder.send().await.map_err(|err| {
                    let error = SyncError::Http(err.to_string());
                    if idempotent || err.is_connect() {
                        BackoffError::transient(error)
                    } else {
                        BackoffError::permanent(error)
                    }
                })?;
                let status = response.status();
                if status.is_success() {
                    return response.json::<GistResponse>().await.map_err(|err| {
                        BackoffError::permanent(SyncError::InvalidPayload(err.to_string()))
                    });
                }

                let body = response.text().await.unwrap_or_default();
                let error = SyncError::Api {
                    status: status.as_u16(),
                    message: api_message(&body, status),
                };
                let retryable =
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if idempotent && retryable {
                    Err(BackoffError::transient(error))
                } else {
                    Err(BackoffError::permanent(error))
                }
            }
        };

        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(4),
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };
        retry(backoff, operation).await
    }
}

fn api_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .map(|parsed| parsed.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GistClient {
        GistClient::with_base_url(Some("ghp_test"), &server.uri())
            .expect("client")
            .with_max_elapsed(Duration::from_secs(5))
    }

    fn backup_body(id: &str, projects: &[Project]) -> serde_json::Value {
        json!({
            "id": id,
            "files": {
                GIST_FILENAME: {
                    "content": serde_json::to_string(projects).expect("json")
                }
            }
        })
    }

    #[test]
    fn missing_token_is_rejected() {
        assert!(matches!(GistClient::new(None), Err(SyncError::MissingToken)));
        assert!(matches!(GistClient::new(Some("  ")), Err(SyncError::MissingToken)));
    }

    #[tokio::test]
    async fn first_push_creates_private_gist() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .and(header("authorization", "token ghp_test"))
            .and(body_partial_json(json!({
                "description": GIST_DESCRIPTION,
                "public": false
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "g123", "files": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .push(&[Project::with_id("p1", "Oak St")], None)
            .await
            .expect("push");
        assert_eq!(id, "g123");
    }

    #[tokio::test]
    async fn later_push_patches_known_gist() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "g123"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).push(&[], Some("g123")).await.expect("push");
        assert_eq!(id, "g123");
    }

    #[tokio::test]
    async fn pull_migrates_backup_contents() {
        let server = MockServer::start().await;
        let projects = vec![Project::with_id("p1", "Oak St")];
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(backup_body("g123", &projects)))
            .mount(&server)
            .await;

        let pulled = client(&server).pull(Some("g123")).await.expect("pull");
        assert_eq!(pulled, projects);
    }

    #[tokio::test]
    async fn pull_without_backup_file_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "g123",
                "files": {"other.txt": {"content": "hello"}}
            })))
            .mount(&server)
            .await;

        let err = client(&server).pull(Some("g123")).await.expect_err("missing file");
        assert!(matches!(err, SyncError::BackupNotFound));
    }

    #[tokio::test]
    async fn pull_without_gist_id_fails_fast() {
        let server = MockServer::start().await;
        let err = client(&server).pull(None).await.expect_err("no id");
        assert!(matches!(err, SyncError::MissingGistId));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).pull(Some("g123")).await.expect_err("401");
        match err {
            SyncError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(backup_body("g123", &[])))
            .mount(&server)
            .await;

        let pulled = client(&server).pull(Some("g123")).await.expect("retried pull");
        assert!(pulled.is_empty());
    }

    #[tokio::test]
    async fn failed_create_is_sent_only_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/gists"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "g2", "files": {}})),
            )
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).push(&[], None).await.expect_err("502");
        assert!(matches!(err, SyncError::Api { status: 502, .. }));
        let requests = server.received_requests().await.expect("recorded requests");
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn failed_patch_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/gists/g123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "g123", "files": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server).push(&[], Some("g123")).await.expect("retried push");
        assert_eq!(id, "g123");
    }

    #[tokio::test]
    async fn corrupt_backup_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gists/g123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "g123",
                "files": {GIST_FILENAME: {"content": "{oops"}}
            })))
            .mount(&server)
            .await;

        let err = client(&server).pull(Some("g123")).await.expect_err("corrupt");
        assert!(matches!(err, SyncError::InvalidPayload(_)));
    }
}
