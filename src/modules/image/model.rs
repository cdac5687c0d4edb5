use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::modules::image::schema::ImageRecord;

/// Record fields known before the index assigns an id.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub original_name: String,
    pub remote_url: String,
    pub short_code: String,
    pub uploaded_at: DateTime<Utc>,
    pub size: u64,
}

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_multipart_size: usize,
    pub max_data_url_size: usize,
    /// Raw JSON body cap, leaving room for base64 overhead.
    pub max_json_body_size: usize,
    pub allowed_mime_types: Vec<String>,
    pub share_base_url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_multipart_size: 5 * 1024 * 1024,   // 5MB
            max_data_url_size: 9 * 512 * 1024,     // 4.5MB
            max_json_body_size: 8 * 1024 * 1024,   // 8MB
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "image/bmp".to_string(),
                "image/avif".to_string(),
            ],
            share_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn with_share_base_url(mut self, base: impl Into<String>) -> Self {
        self.share_base_url = base.into();
        self
    }

    pub fn share_url(&self, short_code: &str) -> String {
        format!("{}/preview/{}", self.share_base_url.trim_end_matches('/'), short_code)
    }
}

/// Which intake path a file arrived through; each has its own size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    Multipart,
    DataUrl,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DataUrlUploadModel {
    #[validate(length(min = 1, message = "No file provided"))]
    pub file: String,
    /// Blank falls back to the stored file name.
    #[validate(length(max = 255, message = "Custom name must be at most 255 characters"))]
    pub custom_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MigrateModel {
    #[validate(custom(function = "validate_is_array"))]
    pub images: serde_json::Value,
}

fn validate_is_array(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_array() {
        Ok(())
    } else {
        Err(ValidationError::new("array").with_message("images must be an array".into()))
    }
}

/// One externally supplied record in a migrate batch.
#[derive(Debug, Deserialize)]
pub struct MigrateImage {
    pub original_name: Option<String>,
    #[serde(alias = "quax_url", alias = "download_url")]
    pub remote_url: Option<String>,
    pub short_code: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MigrationOutcome {
    Migrated(ImageRecord),
    Failed { original_name: Option<String>, error: String },
}

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub success: bool,
    pub migrated: usize,
    pub results: Vec<MigrationOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub image: ImageRecord,
    #[serde(rename = "shareUrl")]
    pub share_url: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: ImageRecord,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub images: usize,
    pub host: &'static str,
    pub index: &'static str,
}
