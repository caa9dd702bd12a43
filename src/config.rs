use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::warn;
use url::Url;
use crate::core::{FileInfo, HttpMethod, Result, UploadError};

pub const DEFAULT_FILE_TYPES: &str = ".jpeg,.jpg,.png";

/// Where uploads are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A presigned URL handed over by the host, used for every upload
    Presigned(String),
    /// A server that hands out one presigned URL per object key
    Server {
        endpoint: String,
        prefix: Option<String>,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploaderConfig {
    /// Either a presigned url or a server endpoint to request one from
    pub presigned_url: Option<String>,
    pub server_endpoint: Option<String>,

    /// Headers for presign requests, e.g. authentication
    pub headers: HashMap<String, String>,

    /// Key namespace, `cache` stores objects under `cache/<key>`
    pub s3_prefix: Option<String>,

    /// Accepted file types for selection, comma separated
    pub file_types: String,

    pub method: HttpMethod,

    /// Emit a `done` snapshot before the final one
    pub emit_done_marker: bool,

    /// Whole-request timeout, none by default
    pub timeout_secs: Option<u64>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            presigned_url: None,
            server_endpoint: None,
            headers: HashMap::new(),
            s3_prefix: None,
            file_types: DEFAULT_FILE_TYPES.to_string(),
            method: HttpMethod::Put,
            emit_done_marker: false,
            timeout_secs: None,
        }
    }
}

impl UploaderConfig {
    pub fn with_presigned_url(url: impl Into<String>) -> Self {
        Self {
            presigned_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_server_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            server_endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn s3_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.s3_prefix = Some(prefix.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn file_types(mut self, file_types: impl Into<String>) -> Self {
        self.file_types = file_types.into();
        self
    }

    pub fn emit_done_marker(mut self, enabled: bool) -> Self {
        self.emit_done_marker = enabled;
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve the destination, rejecting a config that has none.
    pub fn validate(&self) -> Result<Destination> {
        let presigned_url = self.presigned_url.as_deref().filter(|url| !url.is_empty());
        let server_endpoint = self.server_endpoint.as_deref().filter(|url| !url.is_empty());

        match (presigned_url, server_endpoint) {
            (Some(url), endpoint) => {
                if endpoint.is_some() {
                    warn!("both presigned_url and server_endpoint set, using presigned_url");
                }
                Url::parse(url)?;
                Ok(Destination::Presigned(url.to_string()))
            }
            (None, Some(endpoint)) => {
                Url::parse(endpoint)?;
                self.header_map()?;
                Ok(Destination::Server {
                    endpoint: endpoint.to_string(),
                    prefix: self.s3_prefix.clone(),
                })
            }
            (None, None) => Err(UploadError::config(
                "provide a presigned url or a server endpoint to fetch one",
            )),
        }
    }

    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (k, v) in &self.headers {
            headers.insert(HeaderName::from_str(k)?, HeaderValue::from_str(v)?);
        }

        Ok(headers)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Lowercased entries of `file_types`
    pub fn accepted_types(&self) -> Vec<String> {
        self.file_types
            .split(',')
            .map(|entry| entry.trim().to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    /// Whether a file passes the `file_types` filter. An empty filter accepts everything.
    ///
    /// Entries are extensions (`.png`), exact MIME types (`image/png`) or
    /// wildcards (`image/*`).
    pub fn accepts(&self, file: &FileInfo) -> bool {
        let accepted = self.accepted_types();
        if accepted.is_empty() {
            return true;
        }

        let extension = file.extension();
        let content_type = file.content_type.as_deref().map(str::to_ascii_lowercase);

        accepted.iter().any(|entry| {
            if entry.starts_with('.') {
                extension.as_deref() == Some(entry.as_str())
            } else if let Some(major) = entry.strip_suffix("/*") {
                content_type
                    .as_deref()
                    .and_then(|ct| ct.split_once('/'))
                    .is_some_and(|(ct_major, _)| ct_major == major)
            } else {
                content_type.as_deref() == Some(entry.as_str())
            }
        })
    }
}
