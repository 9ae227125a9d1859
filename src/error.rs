use thiserror::Error;

/// Errors surfaced by translation and content-store operations.
///
/// Malformed translation responses are deliberately absent from this
/// taxonomy: the prompt codec degrades them to per-item source-text fallback
/// and logs a warning instead of failing the batch.
#[derive(Debug, Error)]
pub enum Error {
    /// A required credential is not configured. Fatal to the requested
    /// operation, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller's input is unusable (no fields selected, no items
    /// selected). Surfaced before any network activity.
    #[error("validation error: {0}")]
    Validation(String),

    /// An upstream API answered with a non-2xx status.
    #[error("{api} API error ({status}): {message}")]
    UpstreamStatus {
        api: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a usable response (connect, timeout,
    /// body read, or deserialization failure).
    #[error("{api} request failed: {source}")]
    UpstreamTransport {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered 2xx but the payload is missing the expected
    /// shape.
    #[error("{api} API returned an unusable payload: {message}")]
    UpstreamPayload { api: &'static str, message: String },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}
