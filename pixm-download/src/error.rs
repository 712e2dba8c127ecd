use thiserror::Error;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Truncated download: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("Corrupt frame archive: {0}")]
    CorruptArchive(String),

    #[error("Frame decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Asset URL has no usable filename: {0}")]
    BadUrl(String),
}

impl DownloadError {
    /// Faults worth another attempt. A truncated body or an unreadable
    /// archive usually means the transfer broke mid-flight; client errors
    /// other than rate limiting are final.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Io(_) | Self::LengthMismatch { .. } => true,
            Self::CorruptArchive(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Image(_) | Self::BadUrl(_) => false,
        }
    }
}
