pub mod presigned;

pub use presigned::{upload, PresignedUpload, UploadStream, SUCCESS_MARKER};
