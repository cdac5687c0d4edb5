use crate::api::error;

/// Validated upload handed to a remote host.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Generated `<millis>.<ext>` name used for the remote object.
    pub stored_name: String,
    pub original_name: String,
}

/// Remote service that durably stores image bytes and returns a public URL.
#[async_trait::async_trait]
pub trait ImageHost {
    fn name(&self) -> &'static str;

    async fn store(&self, upload: &ImageUpload) -> Result<String, error::SystemError>;
}
