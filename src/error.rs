use thiserror::Error;

/// Error taxonomy for the capture pipeline.
///
/// Most interaction failures never surface as errors at all: the resolver
/// reports `None`, the executor reports `false`, and capture falls down its
/// ladder. This enum covers the genuinely fallible edges — process launch,
/// navigation, screenshot transport, IO, and the structured-events fetch.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Page could not be opened: {0}")]
    PageUnavailable(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event data fetch failed: {0}")]
    DataFetch(String),
}

impl CaptureError {
    /// Only a dead browser process aborts the whole run; everything else is
    /// contained within the target it occurred in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::BrowserLaunchFailed(_))
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for CaptureError {
    fn from(err: reqwest::Error) -> Self {
        CaptureError::DataFetch(err.to_string())
    }
}
