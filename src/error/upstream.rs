use super::IsRetryable;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Local failures of the outbound HTTP layer.
///
/// Provider-side rejections are not errors here; they surface as
/// `ProviderResponse::Rejected`.
#[derive(Debug, ThisError)]
pub enum HttpError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP session used before setup")]
    SessionNotReady,

    #[error("Upstream call timed out on attempt {attempts} (deadline {limit:?})")]
    Timeout { attempts: usize, limit: Duration },

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl IsRetryable for HttpError {
    fn is_retryable(&self) -> bool {
        // Every transport-level failure is worth another try; statuses never reach here.
        matches!(self, HttpError::Request(_))
    }
}
