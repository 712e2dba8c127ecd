use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Errors worth retrying: network faults, rate limiting and
    /// server-side failures. Client errors and contract violations
    /// propagate immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
