mod errors;
mod traits;
mod types;

pub use errors::{Result, UploadError};
pub use traits::UrlSource;
pub use types::{
    FileInfo,
    HttpMethod,
    Payload,
    Progress,
    UploadEvent,
    UploadFile,
    UploadState,
    UploadStatus,
};
