use crate::{
    api::error,
    modules::image::{model::NewImage, schema::ImageRecord},
};

#[async_trait::async_trait]
pub trait ImageRepository {
    /// Backend name reported by the health endpoint.
    fn name(&self) -> &'static str;

    async fn find_all(&self) -> Result<Vec<ImageRecord>, error::SystemError>;

    async fn find_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<ImageRecord>, error::SystemError>;

    /// Assigns an id and appends. Fails with `Conflict` if the short code is
    /// already present.
    async fn create(&self, image: &NewImage) -> Result<ImageRecord, error::SystemError>;

    async fn delete(&self, id: i64) -> Result<Option<ImageRecord>, error::SystemError>;

    async fn count(&self) -> Result<usize, error::SystemError>;
}
