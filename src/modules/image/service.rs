use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use log::info;

use crate::api::error;
use crate::modules::image::{
    model::{
        HealthResponse, MigrateImage, MigrateResponse, MigrationOutcome, NewImage, UploadConfig,
        UploadResponse, UploadSource,
    },
    repository::ImageRepository,
    schema::ImageRecord,
    short_code,
};
use crate::modules::upstream::{ImageHost, ImageUpload};
use crate::utils::{extension_for, parse_data_url, sanitize_filename};

/// File received from a client, before validation.
#[derive(Debug)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub source: UploadSource,
}

#[derive(Clone)]
pub struct ImageService {
    repo: Arc<dyn ImageRepository + Send + Sync>,
    host: Arc<dyn ImageHost + Send + Sync>,
    config: UploadConfig,
}

impl ImageService {
    pub fn with_dependencies(
        repo: Arc<dyn ImageRepository + Send + Sync>,
        host: Arc<dyn ImageHost + Send + Sync>,
        config: UploadConfig,
    ) -> Self {
        info!("ImageService initialized with {} host and {} index", host.name(), repo.name());
        ImageService { repo, host, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    fn size_limit(&self, source: UploadSource) -> usize {
        match source {
            UploadSource::Multipart => self.config.max_multipart_size,
            UploadSource::DataUrl => self.config.max_data_url_size,
        }
    }

    /// Validate file type and size
    fn validate_file(&self, file: &IncomingFile) -> Result<(), error::SystemError> {
        if file.bytes.is_empty() {
            return Err(error::SystemError::bad_request("No file uploaded"));
        }

        let limit = self.size_limit(file.source);
        if file.bytes.len() > limit {
            return Err(error::SystemError::bad_request(format!(
                "File size exceeds maximum allowed size of {} bytes",
                limit
            )));
        }

        if !self.config.allowed_mime_types.iter().any(|m| m == &file.content_type) {
            return Err(error::SystemError::bad_request(format!(
                "File type '{}' is not allowed",
                file.content_type
            )));
        }

        Ok(())
    }

    /// Decode a `data:` URL body into an incoming file.
    pub fn decode_data_url(
        &self,
        data_url: &str,
        custom_name: Option<String>,
    ) -> Result<IncomingFile, error::SystemError> {
        let (mime, payload) = parse_data_url(data_url)?;

        // Reject on encoded length first so oversized bodies are never decoded.
        let limit = self.config.max_data_url_size;
        if payload.len() / 4 * 3 > limit + 2 {
            return Err(error::SystemError::bad_request(format!(
                "File size exceeds maximum allowed size of {} bytes",
                limit
            )));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| error::SystemError::bad_request("File is not valid base64"))?;

        Ok(IncomingFile {
            file_name: custom_name,
            content_type: mime.to_ascii_lowercase(),
            bytes,
            source: UploadSource::DataUrl,
        })
    }

    async fn mint_short_code(&self) -> Result<String, error::SystemError> {
        let repo = self.repo.clone();
        short_code::mint_unique(short_code::generate, move |code| {
            let repo = repo.clone();
            async move { repo.find_by_short_code(&code).await.map(|found| found.is_some()) }
        })
        .await
    }

    /// Validate, store remotely, mint a short code and append the record.
    pub async fn upload_image(
        &self,
        file: IncomingFile,
    ) -> Result<UploadResponse, error::SystemError> {
        self.validate_file(&file)?;

        let extension = extension_for(&file.content_type);
        let stored_name = format!("{}.{}", Utc::now().timestamp_millis(), extension);
        let original_name = file
            .file_name
            .as_deref()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| stored_name.clone());

        info!("Uploading {} ({} bytes) via {}", original_name, file.bytes.len(), self.host.name());

        let size = file.bytes.len() as u64;
        let upload = ImageUpload {
            bytes: file.bytes,
            content_type: file.content_type,
            stored_name,
            original_name: original_name.clone(),
        };
        let remote_url = self.host.store(&upload).await?;

        let short_code = self.mint_short_code().await?;

        let new_image = NewImage {
            original_name,
            remote_url: remote_url.clone(),
            short_code,
            uploaded_at: Utc::now(),
            size,
        };

        let image = self.repo.create(&new_image).await.inspect_err(|e| {
            log::warn!(
                "{} was stored at {} but could not be indexed: {}",
                upload.stored_name,
                remote_url,
                e
            );
        })?;

        info!("Upload success: {} -> {}", image.short_code, image.remote_url);

        let share_url = self.config.share_url(&image.short_code);
        Ok(UploadResponse { success: true, image, share_url })
    }

    /// All records, newest first.
    pub async fn list_images(&self) -> Result<Vec<ImageRecord>, error::SystemError> {
        let mut images = self.repo.find_all().await?;
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(images)
    }

    pub async fn get_image(&self, short_code: &str) -> Result<ImageRecord, error::SystemError> {
        self.repo
            .find_by_short_code(short_code)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Image not found"))
    }

    pub async fn delete_image(&self, id: i64) -> Result<ImageRecord, error::SystemError> {
        let deleted = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Image not found"))?;
        info!("Deleted image {} ({})", deleted.id, deleted.short_code);
        Ok(deleted)
    }

    async fn migrate_one(&self, raw: serde_json::Value) -> Result<ImageRecord, error::SystemError> {
        let image: MigrateImage = serde_json::from_value(raw)
            .map_err(|e| error::SystemError::bad_request(format!("Invalid record: {e}")))?;

        let remote_url = image
            .remote_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| error::SystemError::bad_request("remote_url is required"))?;

        let short_code = match image.short_code {
            Some(code) if !code.is_empty() => code,
            _ => self.mint_short_code().await?,
        };

        let new_image = NewImage {
            original_name: image.original_name.unwrap_or_default(),
            remote_url,
            short_code,
            uploaded_at: image.uploaded_at.unwrap_or_else(Utc::now),
            size: image.size.unwrap_or(0),
        };

        self.repo.create(&new_image).await
    }

    /// Appends externally supplied records one at a time; a failing record is
    /// reported and the batch continues.
    pub async fn migrate_images(
        &self,
        images: Vec<serde_json::Value>,
    ) -> Result<MigrateResponse, error::SystemError> {
        let mut results = Vec::with_capacity(images.len());
        let mut migrated = 0;

        for raw in images {
            let original_name =
                raw.get("original_name").and_then(|v| v.as_str()).map(str::to_string);

            match self.migrate_one(raw).await {
                Ok(record) => {
                    migrated += 1;
                    results.push(MigrationOutcome::Migrated(record));
                }
                Err(e) => {
                    log::warn!("Migration of {:?} failed: {}", original_name, e);
                    results.push(MigrationOutcome::Failed { original_name, error: e.to_string() });
                }
            }
        }

        info!("Migrated {}/{} records", migrated, results.len());
        Ok(MigrateResponse { success: true, migrated, results })
    }

    pub async fn health(&self) -> Result<HealthResponse, error::SystemError> {
        Ok(HealthResponse {
            status: "ok",
            images: self.repo.count().await?,
            host: self.host.name(),
            index: self.repo.name(),
        })
    }
}
