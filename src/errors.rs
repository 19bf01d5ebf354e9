use std::time::Duration;
use thiserror::Error;

/// Errors raised anywhere in the extraction pipeline.
///
/// Only [`ScrapeError::InvalidInput`] ever reaches the caller as an `Err`.
/// Every other variant is recovered where it happens and recorded in
/// `ScrapeResult::errors` through its `Display` form.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure, non-2xx status or timeout on the static tier
    #[error("FetchError: {0}")]
    Fetch(String),

    /// A readiness wait expired
    #[error("RenderTimeoutError: {stage} did not complete within {waited:?}")]
    RenderTimeout { stage: &'static str, waited: Duration },

    /// A selector matched nothing or a click had no effect
    #[error("InteractionError: {0}")]
    Interaction(String),

    /// The next page target was already visited in this request
    #[error("PaginationLoopDetected: {0} was already visited")]
    PaginationLoop(String),

    /// WebDriver connection or command failure
    #[error("SessionError: {0}")]
    Session(String),

    /// The caller supplied deadline passed before the pipeline finished
    #[error("TimeoutError: deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),

    /// Malformed URL or disallowed scheme
    #[error("InvalidInputError: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ScrapeError::Fetch(format!("request timed out: {}", error))
        } else if let Some(status) = error.status() {
            ScrapeError::Fetch(format!("HTTP {}", status))
        } else {
            ScrapeError::Fetch(error.to_string())
        }
    }
}

impl From<fantoccini::error::CmdError> for ScrapeError {
    fn from(error: fantoccini::error::CmdError) -> Self {
        ScrapeError::Session(error.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for ScrapeError {
    fn from(error: fantoccini::error::NewSessionError) -> Self {
        ScrapeError::Session(error.to_string())
    }
}
