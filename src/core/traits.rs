use async_trait::async_trait;
use super::types::FileInfo;
use super::errors::Result;

/// Resolves the presigned destination a file should be sent to
#[async_trait]
pub trait UrlSource: Send + Sync {
    async fn presigned_url(&self, file: &FileInfo) -> Result<String>;
}
