//! Error types for braid-term.

use std::io;

/// Error type for virtual terminal operations.
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad argument to a public operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Recording header or event row could not be parsed.
    #[error("recording format error: {0}")]
    Recording(String),
}

/// Result type alias for braid-term operations.
pub type Result<T> = std::result::Result<T, TermError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TermError::InvalidInput("zero width".into());
        assert_eq!(err.to_string(), "invalid input: zero width");
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let err: TermError = io_err.into();
        assert!(matches!(err, TermError::Io(_)));
    }
}
