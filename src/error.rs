use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the processing pipeline.
///
/// Every stage reports through this enum so the runner can decide, per
/// failure, whether to retry (transient remote conditions) or fail the
/// record outright. All variants are fatal for the record except
/// `Transient`, which the retry layer may absorb.
#[derive(Debug, Error)]
pub enum StageError {
    /// Source media unreadable or duration/size unavailable.
    #[error("probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    /// ffmpeg invocation failed (missing tool, bad parameters, bad input).
    #[error("extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// Remote call failed for a recoverable reason (network, timeout,
    /// throttling, server error). Retried with bounded attempts.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// Transcription service rejected the request outright.
    #[error("transcription rejected: {0}")]
    Transcription(String),

    /// Text-generation service rejected the request outright.
    #[error("formatting rejected: {0}")]
    Formatting(String),

    /// Internal contract broken (e.g. unfilled transcript slot at merge
    /// time). A programming defect, not a runtime condition.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Local filesystem failure (chunk read, output write).
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Retry predicate used by `RetryPolicy`.
    pub fn is_transient(&self) -> bool {
        matches!(self, StageError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_predicate() {
        assert!(StageError::Transient("timeout".into()).is_transient());
        assert!(!StageError::Transcription("unsupported".into()).is_transient());
        assert!(!StageError::Invariant("slot unfilled".into()).is_transient());
    }
}
