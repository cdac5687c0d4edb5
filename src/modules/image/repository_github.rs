use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    api::error,
    modules::{
        image::{model::NewImage, repository::ImageRepository, schema::ImageRecord},
        upstream::ContentsClient,
    },
};

pub const MAX_COMMIT_ATTEMPTS: usize = 5;

/// Index kept as a JSON array file inside the content repository, most
/// recent entry first. Every write is fetch, mutate, then commit against the
/// sha that was read; a stale sha restarts the cycle.
pub struct ImageRepositoryGithub {
    contents: Arc<ContentsClient>,
    index_path: String,
}

/// Raw index entries plus the revision they were read at. Entries are kept as
/// JSON values so unknown fields and legacy shapes survive a rewrite.
struct IndexSnapshot {
    entries: Vec<Value>,
    sha: Option<String>,
}

impl IndexSnapshot {
    fn records(&self) -> impl Iterator<Item = ImageRecord> + '_ {
        self.entries.iter().filter_map(|entry| serde_json::from_value(entry.clone()).ok())
    }
}

impl ImageRepositoryGithub {
    pub fn new(contents: Arc<ContentsClient>, index_path: impl Into<String>) -> Self {
        Self { contents, index_path: index_path.into() }
    }

    async fn load(&self) -> Result<IndexSnapshot, error::SystemError> {
        let Some(file) = self.contents.get_file(&self.index_path).await? else {
            return Ok(IndexSnapshot { entries: Vec::new(), sha: None });
        };

        let entries = match serde_json::from_slice::<Value>(&file.content) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) | Err(_) => {
                log::warn!("{} is not a JSON array, starting from an empty index", self.index_path);
                Vec::new()
            }
        };

        Ok(IndexSnapshot { entries, sha: Some(file.sha) })
    }

    /// Applies `mutate` to a fresh snapshot and commits it, re-reading and
    /// retrying when another writer got there first. Errors from `mutate`
    /// are returned as-is without committing.
    async fn commit_with<T, F>(&self, message: &str, mut mutate: F) -> Result<T, error::SystemError>
    where
        F: FnMut(&mut IndexSnapshot) -> Result<T, error::SystemError>,
    {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut snapshot = self.load().await?;
            let output = mutate(&mut snapshot)?;

            let body = serde_json::to_vec_pretty(&snapshot.entries)?;
            let sha = snapshot.sha.as_deref();
            match self.contents.put_file(&self.index_path, &body, message, sha).await {
                Ok(()) => return Ok(output),
                Err(error::SystemError::StaleRevision(detail)) => {
                    log::warn!(
                        "Index commit attempt {}/{} lost a race: {}",
                        attempt,
                        MAX_COMMIT_ATTEMPTS,
                        detail
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(error::SystemError::upstream(format!(
            "Gave up updating {} after {} conflicting writes",
            self.index_path, MAX_COMMIT_ATTEMPTS
        )))
    }
}

#[async_trait::async_trait]
impl ImageRepository for ImageRepositoryGithub {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn find_all(&self) -> Result<Vec<ImageRecord>, error::SystemError> {
        Ok(self.load().await?.records().collect())
    }

    async fn find_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<ImageRecord>, error::SystemError> {
        Ok(self.load().await?.records().find(|r| r.short_code == short_code))
    }

    async fn create(&self, image: &NewImage) -> Result<ImageRecord, error::SystemError> {
        let message = format!("Index: Add metadata for {}", image.original_name);

        self.commit_with(&message, |snapshot| {
            if snapshot.records().any(|r| r.short_code == image.short_code) {
                return Err(error::SystemError::conflict(format!(
                    "Short code '{}' already exists",
                    image.short_code
                )));
            }

            let mut id = Utc::now().timestamp_millis();
            while snapshot.records().any(|r| r.id == id) {
                id += 1;
            }

            let record = ImageRecord {
                id,
                original_name: image.original_name.clone(),
                remote_url: image.remote_url.clone(),
                short_code: image.short_code.clone(),
                uploaded_at: image.uploaded_at,
                size: image.size,
            };
            snapshot.entries.insert(0, serde_json::to_value(&record)?);
            Ok(record)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<Option<ImageRecord>, error::SystemError> {
        let Some(existing) = self.load().await?.records().find(|r| r.id == id) else {
            return Ok(None);
        };

        let message = format!("Index: Remove metadata for {}", existing.short_code);
        let removed = self
            .commit_with(&message, |snapshot| {
                let position = snapshot
                    .entries
                    .iter()
                    .position(|entry| {
                        serde_json::from_value::<ImageRecord>(entry.clone())
                            .map(|r| r.id == id)
                            .unwrap_or(false)
                    })
                    .ok_or_else(|| error::SystemError::not_found("Image not found"))?;
                Ok(serde_json::from_value::<ImageRecord>(snapshot.entries.remove(position))?)
            })
            .await;

        match removed {
            Ok(record) => Ok(Some(record)),
            // Removed by another writer between the check and the commit.
            Err(error::SystemError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn count(&self) -> Result<usize, error::SystemError> {
        Ok(self.load().await?.records().count())
    }
}
