use std::path::{Path, PathBuf};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::errors::Result;

/// Upload status of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Transfer about to start, nothing sent yet
    Ready,
    /// Bytes are being handed to the transport
    Uploading,
    /// Transport finished, outcome not yet classified
    Done,
    /// Storage answered 200
    Success,
    /// Storage answered anything but 200
    Error,
    /// Caller asked to stop the transfer
    Cancelled,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Success | Self::Error | Self::Cancelled)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Put,
    Post,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

/// File metadata carried by every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name).map(String::from);
        Self { name, size, content_type }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lowercased extension including the leading dot, e.g. `.png`
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
    }
}

fn guess_content_type(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        _ => return None,
    };
    Some(mime)
}

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum Payload {
    Memory(Bytes),
    Path(PathBuf),
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub info: FileInfo,
    pub payload: Payload,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            info: FileInfo::new(name, data.len() as u64),
            payload: Payload::Memory(data),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            info: FileInfo::new(name, size),
            payload: Payload::Path(path.to_path_buf()),
        })
    }
}

/// Derived transfer metrics; every field is null when unknown
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Seconds
    pub time_remaining: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    pub percent_completed: Option<u8>,
    pub speed_human: Option<String>,
}

/// Snapshot of one upload attempt at one instant
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub status: UploadStatus,
    pub file: FileInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub progress: Progress,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl UploadState {
    pub fn ready(file: FileInfo) -> Self {
        Self {
            status: UploadStatus::Ready,
            file,
            source: None,
            progress: Progress {
                percent_completed: Some(0),
                ..Progress::default()
            },
            response: None,
            error: None,
        }
    }

    pub fn uploading(file: FileInfo, progress: Progress) -> Self {
        Self {
            status: UploadStatus::Uploading,
            file,
            source: None,
            progress,
            response: None,
            error: None,
        }
    }

    /// The completion snapshot every terminal outcome is derived from
    pub fn done(file: FileInfo) -> Self {
        Self {
            status: UploadStatus::Done,
            file,
            source: None,
            progress: Progress {
                time_remaining: Some(0),
                percent_completed: Some(100),
                ..Progress::default()
            },
            response: None,
            error: None,
        }
    }

    pub fn into_cancelled(mut self) -> Self {
        self.status = UploadStatus::Cancelled;
        self.progress.time_remaining = None;
        self.progress.percent_completed = None;
        self
    }

    pub fn into_success(mut self, source: String, response: Value) -> Self {
        self.status = UploadStatus::Success;
        self.source = Some(source);
        self.response = Some(response);
        self
    }

    pub fn into_error(mut self, response: Value, error: String) -> Self {
        self.status = UploadStatus::Error;
        self.response = Some(response);
        self.error = Some(error);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Events published by the uploader component
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Every snapshot of the running attempt
    State(UploadState),

    /// All terminal snapshots seen so far, oldest first
    Completed(Vec<UploadState>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        use UploadStatus::*;

        assert!(!Ready.is_terminal());
        assert!(!Uploading.is_terminal());
        assert!(Done.is_terminal());
        assert!(Success.is_terminal());
        assert!(Error.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_ready_snapshot() {
        let state = UploadState::ready(FileInfo::new("a.png", 10));
        assert_eq!(state.status, UploadStatus::Ready);
        assert_eq!(state.progress.percent_completed, Some(0));
        assert_eq!(state.progress.speed, None);
        assert_eq!(state.progress.time_remaining, None);
        assert_eq!(state.progress.speed_human, None);
        assert!(state.response.is_none());
    }

    #[test]
    fn test_cancelled_clears_progress() {
        let state = UploadState::done(FileInfo::new("a.png", 10)).into_cancelled();
        assert_eq!(state.status, UploadStatus::Cancelled);
        assert_eq!(state.progress.percent_completed, None);
        assert_eq!(state.progress.time_remaining, None);
    }

    #[test]
    fn test_serialized_shape() {
        let state = UploadState::ready(FileInfo::new("photo.JPG", 3));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["file"]["type"], "image/jpeg");
        assert_eq!(json["progress"]["percentCompleted"], 0);
        assert!(json["progress"]["timeRemaining"].is_null());
        assert!(json.get("source").is_none());
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(FileInfo::new("A.PNG", 1).extension().as_deref(), Some(".png"));
        assert_eq!(FileInfo::new("README", 1).extension(), None);
    }

    #[test]
    fn test_method_default_is_put() {
        assert_eq!(HttpMethod::default(), HttpMethod::Put);
        assert_eq!(reqwest::Method::from(HttpMethod::Post), reqwest::Method::POST);
    }
}
