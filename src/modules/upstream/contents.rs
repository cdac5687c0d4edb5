//! Minimal client for the GitHub repository contents API.
//!
//! Used both to commit image files and to keep the JSON index. Writes to an
//! existing path must carry the blob `sha` last read; GitHub answers a stale
//! or missing sha with 409/422, surfaced here as `StaleRevision`.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{api::error, constants::GithubEnv};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ContentsClient {
    http: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
    branch: String,
    api_url: String,
    raw_url: String,
}

impl ContentsClient {
    pub fn new(http: reqwest::Client, env: &GithubEnv) -> Self {
        Self {
            http,
            token: env.token.clone(),
            owner: env.owner.clone(),
            repo: env.repo.clone(),
            branch: env.branch.clone(),
            api_url: env.api_url.trim_end_matches('/').to_string(),
            raw_url: env.raw_url.trim_end_matches('/').to_string(),
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/contents/{}", self.api_url, self.owner, self.repo, path)
    }

    /// Public URL of a committed file, derived without a round trip.
    pub fn raw_url(&self, path: &str) -> String {
        format!("{}/{}/{}/{}/{}", self.raw_url, self.owner, self.repo, self.branch, path)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(reqwest::header::AUTHORIZATION, format!("token {}", self.token))
            .header(reqwest::header::USER_AGENT, self.owner.as_str())
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
    }

    /// Fetches a file and its revision. `Ok(None)` when the path does not exist.
    pub async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, error::SystemError> {
        let response = self
            .authorized(self.http.get(self.contents_url(path)))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{} not found on {}/{}", path, self.owner, self.repo);
            return Ok(None);
        }
        if !status.is_success() {
            let detail = error_message(response).await;
            return Err(error::SystemError::upstream(format!(
                "GitHub fetch of {path} failed (status {}): {detail}",
                status.as_u16()
            )));
        }

        let body: ContentsResponse = response.json().await?;
        // GitHub wraps base64 content at 60 columns.
        let compact: String = body.content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let content = STANDARD.decode(compact)?;

        Ok(Some(RemoteFile { content, sha: body.sha }))
    }

    /// Creates or overwrites a file. Pass the sha last read when overwriting.
    pub async fn put_file(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), error::SystemError> {
        let request = PutContentsRequest {
            message,
            content: STANDARD.encode(bytes),
            branch: &self.branch,
            sha,
        };

        let response =
            self.authorized(self.http.put(self.contents_url(path))).json(&request).send().await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                "Committed {} ({} bytes) to {}/{}",
                path,
                bytes.len(),
                self.owner,
                self.repo
            );
            return Ok(());
        }

        let detail = error_message(response).await;
        match status {
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(error::SystemError::StaleRevision(format!("{path}: {detail}").into()))
            }
            _ => Err(error::SystemError::upstream(format!(
                "GitHub commit failed (status {}): {detail}",
                status.as_u16()
            ))),
        }
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let reason = response.status().canonical_reason().unwrap_or("unknown error").to_string();
    match response.json::<GithubErrorBody>().await {
        Ok(GithubErrorBody { message: Some(message) }) => message,
        _ => reason,
    }
}
