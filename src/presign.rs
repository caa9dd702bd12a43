use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use tracing::debug;
use url::Url;
use crate::core::{FileInfo, Result, UploadError, UrlSource};
use crate::utils::{file_key, prefixed_key};

/// A presigned URL supplied up front
#[derive(Debug, Clone)]
pub struct StaticUrl(String);

impl StaticUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

#[async_trait]
impl UrlSource for StaticUrl {
    async fn presigned_url(&self, _file: &FileInfo) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Asks an application server for a one-time upload URL: `GET <endpoint>?key=<key>`
#[derive(Debug, Clone)]
pub struct PresignedUrlFetcher {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    prefix: Option<String>,
}

impl PresignedUrlFetcher {
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            headers: HeaderMap::new(),
            prefix: None,
        })
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Presigned URL for `key`, with the configured prefix applied.
    pub async fn fetch(&self, key: &str) -> Result<String> {
        let key = prefixed_key(self.prefix.as_deref(), key);
        debug!(endpoint = %self.endpoint, key = %key, "requesting presigned url");

        let response = self
            .client
            .get(self.endpoint.clone())
            .headers(self.headers.clone())
            .query(&[("key", key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::presign(status.as_u16(), message));
        }

        let url = response.text().await?;
        Ok(url.trim().to_string())
    }
}

#[async_trait]
impl UrlSource for PresignedUrlFetcher {
    async fn presigned_url(&self, file: &FileInfo) -> Result<String> {
        self.fetch(&file_key(&file.name)).await
    }
}
