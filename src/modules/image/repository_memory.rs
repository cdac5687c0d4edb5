use tokio::sync::RwLock;

use crate::{
    api::error,
    modules::image::{model::NewImage, repository::ImageRepository, schema::ImageRecord},
};

struct MemoryIndex {
    records: Vec<ImageRecord>,
    next_id: i64,
}

/// Process-local index. Contents are lost on restart.
pub struct ImageRepositoryMemory {
    index: RwLock<MemoryIndex>,
}

impl ImageRepositoryMemory {
    pub fn new() -> Self {
        Self { index: RwLock::new(MemoryIndex { records: Vec::new(), next_id: 1 }) }
    }
}

impl Default for ImageRepositoryMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ImageRepository for ImageRepositoryMemory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_all(&self) -> Result<Vec<ImageRecord>, error::SystemError> {
        Ok(self.index.read().await.records.clone())
    }

    async fn find_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<ImageRecord>, error::SystemError> {
        let index = self.index.read().await;
        Ok(index.records.iter().find(|r| r.short_code == short_code).cloned())
    }

    async fn create(&self, image: &NewImage) -> Result<ImageRecord, error::SystemError> {
        let mut index = self.index.write().await;

        if index.records.iter().any(|r| r.short_code == image.short_code) {
            return Err(error::SystemError::conflict(format!(
                "Short code '{}' already exists",
                image.short_code
            )));
        }

        // Ids are never reused, even after deletes.
        let id = index.next_id;
        index.next_id += 1;

        let record = ImageRecord {
            id,
            original_name: image.original_name.clone(),
            remote_url: image.remote_url.clone(),
            short_code: image.short_code.clone(),
            uploaded_at: image.uploaded_at,
            size: image.size,
        };
        index.records.push(record.clone());

        Ok(record)
    }

    async fn delete(&self, id: i64) -> Result<Option<ImageRecord>, error::SystemError> {
        let mut index = self.index.write().await;
        let position = index.records.iter().position(|r| r.id == id);
        Ok(position.map(|i| index.records.remove(i)))
    }

    async fn count(&self) -> Result<usize, error::SystemError> {
        Ok(self.index.read().await.records.len())
    }
}
