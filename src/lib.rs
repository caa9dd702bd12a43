pub mod config;
pub mod core;
pub mod presign;
pub mod progress;
pub mod uploader;
pub mod uploaders;
pub mod utils;

// Re-export the types hosts work with
pub use crate::core::{
    FileInfo,
    HttpMethod,
    Payload,
    Progress,
    Result,
    UploadError,
    UploadEvent,
    UploadFile,
    UploadState,
    UploadStatus,
    UrlSource,
};

pub use config::{Destination, UploaderConfig};
pub use presign::{PresignedUrlFetcher, StaticUrl};
pub use uploader::PresignedUploader;
pub use uploaders::{upload, PresignedUpload, UploadStream};

pub use tokio_util::sync::CancellationToken;
