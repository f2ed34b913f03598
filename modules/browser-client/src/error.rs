use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// Could not reach the browser service at all (connect/DNS failure).
    #[error("Browser service unreachable: {0}")]
    Unreachable(String),

    /// The service answered but the fetch failed (navigation error,
    /// goto timeout, auth wall).
    #[error("Browser API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            BrowserError::Unreachable(err.to_string())
        } else {
            BrowserError::Network(err.to_string())
        }
    }
}
