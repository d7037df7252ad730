/// Errors surfaced by a streaming session.
///
/// `Http` covers a non-2xx initial response and is never retried here —
/// the command layer decides what to tell the user. `Cancelled` is kept
/// separate from `Stream` so a deliberately abandoned session is never
/// reported as a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RagError {
    /// The completion endpoint answered with a non-success status.
    #[error("completion request failed with status {status}")]
    Http { status: u16 },

    /// The byte stream ended abnormally after a successful response.
    #[error("stream transport error: {0}")]
    Stream(String),

    /// The response bytes are not valid UTF-8, beyond what incremental
    /// decoding can absorb at a chunk boundary.
    #[error("response stream is not valid UTF-8")]
    Decode,

    /// The session was cancelled by the caller.
    #[error("session cancelled")]
    Cancelled,
}

impl RagError {
    /// True for the one status the caller messages differently.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RagError::Http { status: 429 })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RagError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(RagError::Http { status: 429 }.is_rate_limited());
        assert!(!RagError::Http { status: 500 }.is_rate_limited());
        assert!(!RagError::Stream("reset".to_string()).is_rate_limited());
    }

    #[test]
    fn test_cancelled_is_not_rate_limited() {
        let err = RagError::Cancelled;
        assert!(err.is_cancelled());
        assert!(!err.is_rate_limited());
    }
}
