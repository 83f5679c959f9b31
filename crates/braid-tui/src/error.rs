//! Error types for braid-tui.

use std::io;

/// Error type for braid-tui operations.
#[derive(Debug, thiserror::Error)]
pub enum BraidError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad argument to a public operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying tty/pty pipe closed; the loop shuts down cleanly.
    #[error("adapter closed")]
    AdapterClosed,

    /// A feature was used that the terminal does not support.
    #[error("capability missing: {0}")]
    CapabilityMissing(String),

    /// A widget callback or render step failed.
    #[error("widget error: {0}")]
    Widget(String),

    /// Layout computation failed.
    #[error("layout error: {0}")]
    Layout(String),

    /// A `wait_until` condition did not hold in time.
    #[error("timeout at {location}: {message}")]
    Timeout {
        /// What was being waited for.
        message: String,
        /// Source location of the waiting call site.
        location: String,
        /// The last observed screen, for the failure report.
        last_snapshot: Option<String>,
    },

    /// Error from the terminal model.
    #[error(transparent)]
    Term(#[from] braid_term::TermError),
}

/// Result type alias for braid-tui operations.
pub type Result<T> = std::result::Result<T, BraidError>;
