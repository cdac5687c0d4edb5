use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::{
    api::error,
    modules::upstream::host::{ImageHost, ImageUpload},
};

const BODY_EXCERPT_CHARS: usize = 100;

/// Anonymous public file host taking a multipart `files[]` upload.
pub struct QuaxHost {
    http: reqwest::Client,
    upload_url: String,
    referer: String,
}

#[derive(Debug, Deserialize)]
struct QuaxEnvelope {
    files: Vec<QuaxFile>,
}

#[derive(Debug, Deserialize)]
struct QuaxFile {
    url: String,
}

impl QuaxHost {
    pub fn new(
        http: reqwest::Client,
        upload_url: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self { http, upload_url: upload_url.into(), referer: referer.into() }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// The service answers either with a bare URL or with a `{ files: [{ url }] }`
/// envelope depending on the deployment.
fn parse_upload_response(body: &str) -> Result<String, error::SystemError> {
    let body = body.trim();
    if body.starts_with("http") {
        if let Ok(url) = reqwest::Url::parse(body) {
            if matches!(url.scheme(), "http" | "https") && url.has_host() {
                return Ok(body.to_string());
            }
        }
    }

    match serde_json::from_str::<QuaxEnvelope>(body) {
        Ok(envelope) => match envelope.files.into_iter().next() {
            Some(file) if !file.url.is_empty() => Ok(file.url),
            _ => Err(error::SystemError::upstream("qu.ax upload failed: no files returned")),
        },
        Err(_) => Err(error::SystemError::upstream(format!(
            "qu.ax upload failed: response was not a valid URL. Response body: \"{}\"",
            excerpt(body)
        ))),
    }
}

#[async_trait::async_trait]
impl ImageHost for QuaxHost {
    fn name(&self) -> &'static str {
        "quax"
    }

    async fn store(&self, upload: &ImageUpload) -> Result<String, error::SystemError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.stored_name.clone())
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("files[]", part);

        tracing::info!("Uploading {} ({} bytes) to qu.ax", upload.stored_name, upload.bytes.len());

        let response = self
            .http
            .post(&self.upload_url)
            .header(reqwest::header::REFERER, self.referer.as_str())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body = body.trim();
            return Err(error::SystemError::upstream(format!(
                "qu.ax upload failed (status {}): {}",
                status.as_u16(),
                if body.is_empty() { "No response body".to_string() } else { excerpt(body) }
            )));
        }

        let url = parse_upload_response(&body)?;
        tracing::info!("qu.ax stored {} at {}", upload.stored_name, url);
        Ok(url)
    }
}
