/// Application-level errors
///
/// Catalog failures are absorbed by the feed repository and storage failures by
/// the stores, so callers outside this crate mostly see these in logs.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Catalog API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("Storage read error: {0}")]
    StorageRead(String),

    #[error("Storage write error: {0}")]
    StorageWrite(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request already in flight: {0}")]
    RequestInFlight(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable reason code used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NetworkUnavailable(_) => "network_unavailable",
            AppError::Timeout(_) => "timeout",
            AppError::Upstream { .. } => "upstream_error",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::StorageRead(_) => "storage_read_error",
            AppError::StorageWrite(_) => "storage_write_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::RequestInFlight(_) => "request_in_flight",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else if e.is_decode() {
            AppError::MalformedResponse(e.to_string())
        } else if let Some(status) = e.status() {
            AppError::Upstream {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            // connect, DNS, TLS and request-building failures
            AppError::NetworkUnavailable(e.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
