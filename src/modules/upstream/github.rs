use std::sync::Arc;

use crate::{
    api::error,
    modules::upstream::{
        contents::ContentsClient,
        host::{ImageHost, ImageUpload},
    },
};

const UPLOAD_DIR: &str = "uploads";

/// Commits image bytes into a repository and serves them from the raw
/// content domain.
pub struct GithubHost {
    contents: Arc<ContentsClient>,
}

impl GithubHost {
    pub fn new(contents: Arc<ContentsClient>) -> Self {
        Self { contents }
    }
}

#[async_trait::async_trait]
impl ImageHost for GithubHost {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn store(&self, upload: &ImageUpload) -> Result<String, error::SystemError> {
        let path = format!("{UPLOAD_DIR}/{}", upload.stored_name);
        let message = format!("Upload: {}", upload.original_name);

        // New paths never carry a sha, so a rejection here is not a retryable race.
        self.contents.put_file(&path, &upload.bytes, &message, None).await.map_err(|e| match e {
            error::SystemError::StaleRevision(detail) => {
                error::SystemError::upstream(format!("GitHub commit failed: {detail}"))
            }
            other => other,
        })?;

        Ok(self.contents.raw_url(&path))
    }
}
