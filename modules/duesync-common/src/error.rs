use thiserror::Error;

/// Pipeline error taxonomy. The variant decides retry behavior: data
/// invariants and authentication failures are terminal, everything else
/// goes back through the activity retry loop.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Transient IO error: {0}")]
    TransientIo(String),

    #[error("Page failure for {url}: {reason}")]
    PagePartial { url: String, reason: String },

    #[error("Oracle returned malformed output: {0}")]
    OracleMalformed(String),

    #[error("Data invariant violated: {0}")]
    DataInvariant(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::DataInvariant(_) | Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_and_auth_errors_are_terminal() {
        assert!(!SyncError::DataInvariant("missing course_id".into()).is_retryable());
        assert!(!SyncError::Authentication("expired session".into()).is_retryable());
    }

    #[test]
    fn io_and_oracle_errors_retry() {
        assert!(SyncError::TransientIo("connection reset".into()).is_retryable());
        assert!(SyncError::OracleMalformed("truncated JSON".into()).is_retryable());
        assert!(SyncError::Fatal("browser launch".into()).is_retryable());
    }
}
