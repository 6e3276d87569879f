use crate::domain::models::SyncConfig;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use url::Url;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Where the snapshot file lives in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileLocation {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl RemoteFileLocation {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            owner: config.owner.trim().to_string(),
            repo: config.repo.trim().to_string(),
            branch: config.effective_branch().to_string(),
            path: config.effective_file_path().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded UTF-8 body.
    pub content: String,
    pub revision: String,
}

#[derive(Debug, Clone)]
pub struct PutFileRequest {
    pub message: String,
    pub content: String,
    pub branch: String,
    pub revision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFileResponse {
    pub revision: Option<String>,
}

#[async_trait]
pub trait RemoteFileClient: Send + Sync {
    /// `Ok(None)` when the file does not exist yet.
    async fn get_file(
        &self,
        token: &str,
        location: &RemoteFileLocation,
    ) -> Result<Option<RemoteFile>, InfraError>;

    async fn put_file(
        &self,
        token: &str,
        location: &RemoteFileLocation,
        request: PutFileRequest,
    ) -> Result<PutFileResponse, InfraError>;
}

pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

pub fn decode_content(encoded: &str) -> Result<String, InfraError> {
    let compact = encoded
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|error| InfraError::Parse(format!("remote content is not valid base64: {error}")))?;
    String::from_utf8(bytes)
        .map_err(|error| InfraError::Parse(format!("remote content is not valid UTF-8: {error}")))
}

#[derive(Debug, Clone)]
pub struct ReqwestGitHubContentsClient {
    client: Client,
    api_base: String,
}

impl ReqwestGitHubContentsClient {
    pub fn new(api_base: impl Into<String>, user_agent: &str) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed to build http client: {error}")))?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::SyncConfiguration(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn contents_endpoint(&self, location: &RemoteFileLocation) -> Result<Url, InfraError> {
        Self::ensure_non_empty(&location.owner, "owner")?;
        Self::ensure_non_empty(&location.repo, "repo")?;

        let mut url = Url::parse(&self.api_base)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid remote api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("remote api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("repos");
            segments.push(&location.owner);
            segments.push(&location.repo);
            segments.push("contents");
            segments.extend(location.path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }

    fn http_error(status: StatusCode, body: &str) -> String {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        match message {
            Some(message) => format!("http {}: {message}", status.as_u16()),
            None => format!("http {}", status.as_u16()),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Debug, serde::Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, serde::Deserialize)]
struct PutContentsResponse {
    content: Option<PutContentsFile>,
}

#[derive(Debug, serde::Deserialize)]
struct PutContentsFile {
    sha: Option<String>,
}

#[async_trait]
impl RemoteFileClient for ReqwestGitHubContentsClient {
    async fn get_file(
        &self,
        token: &str,
        location: &RemoteFileLocation,
    ) -> Result<Option<RemoteFile>, InfraError> {
        Self::ensure_non_empty(token, "token")?;
        let endpoint = self.contents_endpoint(location)?;

        let response = self
            .client
            .get(endpoint)
            .query(&[("ref", location.branch.as_str())])
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(|error| InfraError::Remote(format!("network error while reading remote file: {error}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Remote(format!("failed reading remote file response: {error}")))?;
        if !status.is_success() {
            return Err(InfraError::Remote(Self::http_error(status, &body)));
        }

        let parsed: ContentsResponse = serde_json::from_str(&body)
            .map_err(|error| InfraError::Parse(format!("invalid contents payload: {error}")))?;
        let content = decode_content(parsed.content.as_deref().unwrap_or_default())?;
        Ok(Some(RemoteFile {
            content,
            revision: parsed.sha,
        }))
    }

    async fn put_file(
        &self,
        token: &str,
        location: &RemoteFileLocation,
        request: PutFileRequest,
    ) -> Result<PutFileResponse, InfraError> {
        Self::ensure_non_empty(token, "token")?;
        let endpoint = self.contents_endpoint(location)?;

        let body = PutContentsBody {
            message: &request.message,
            content: encode_content(&request.content),
            branch: &request.branch,
            sha: request.revision.as_deref(),
        };
        let response = self
            .client
            .put(endpoint)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(|error| InfraError::RemoteWrite(format!("network error while writing remote file: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::RemoteWrite(format!("failed reading write response: {error}")))?;
        if !status.is_success() {
            return Err(InfraError::RemoteWrite(Self::http_error(status, &body)));
        }

        let revision = serde_json::from_str::<PutContentsResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.content)
            .and_then(|file| file.sha);
        Ok(PutFileResponse { revision })
    }
}
