//! Error taxonomy for remote content access.

use thiserror::Error;

/// Result type for content service operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Errors from the remote content service.
///
/// None of these are fatal to the engine: a failed page load leaves the
/// accumulated state untouched and the host decides whether to retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The service answered with a non-success status
    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// The request never completed
    #[error("Transport error for {url}: {detail}")]
    Transport { url: String, detail: String },

    /// The response arrived but could not be decoded
    #[error("Invalid payload from {url}: {detail}")]
    Payload { url: String, detail: String },

    /// The request could not even be constructed
    #[error("Invalid request: {detail}")]
    Invalid { detail: String },
}

impl FetchError {
    /// Create a status error.
    pub fn status<U: Into<String>>(status: u16, url: U) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create a transport error.
    pub fn transport<U: Into<String>, D: Into<String>>(url: U, detail: D) -> Self {
        Self::Transport {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Create a payload error.
    pub fn payload<U: Into<String>, D: Into<String>>(url: U, detail: D) -> Self {
        Self::Payload {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid<D: Into<String>>(detail: D) -> Self {
        Self::Invalid {
            detail: detail.into(),
        }
    }

    /// Whether the failure is worth retrying without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Transport { .. } => true,
            Self::Payload { .. } | Self::Invalid { .. } => false,
        }
    }
}
