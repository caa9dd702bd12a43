use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upload could not be started: {0}")]
    Startup(String),

    #[error("Presign endpoint error: status code {status_code}, message: {message}")]
    Presign {
        status_code: u16,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
}

impl UploadError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup(message.into())
    }

    pub fn presign(status_code: u16, message: impl Into<String>) -> Self {
        Self::Presign {
            status_code,
            message: message.into(),
        }
    }

    /// Whether the failure happened on the wire, after the transfer was started.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
