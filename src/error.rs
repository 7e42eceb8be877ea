//! Error taxonomy shared by every communication object.
//!
//! `Timeout` is intentionally not a variant here: a timeout is not an
//! API-level error, it surfaces as `None`/`false` from the method that
//! would otherwise have returned a value.

use std::io;

/// Permanent failure produced by the async core or one of its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AsyncError {
    /// A `send` made zero bytes of progress on a connection that should
    /// have been ready.
    #[error("network error on {0}")]
    NetworkError(String),

    /// The peer closed the connection while a partial operation was in
    /// flight.
    #[error("connection lost on {0}")]
    ConnectionLost(String),

    /// The operation was aborted via `cancel`, or its owning client is
    /// stopping.
    #[error("operation cancelled")]
    Cancelled,

    /// The requested feature was not compiled in.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A collaborator rejected malformed input.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Generic stream-boundary failure forwarded unchanged from a
    /// collaborator.
    #[error("file problem: {0}")]
    FileProblem(String),

    /// Malformed file content.
    #[error("file format error: {0}")]
    FileFormat(String),

    /// Path/filesystem level failure.
    #[error("filesystem error: {0}")]
    FileSystem(String),

    /// A read hit end-of-file before the expected amount of data arrived.
    #[error("file too short")]
    FileTooShort,

    /// An OS-level failure that does not fit any of the above.
    #[error(transparent)]
    SystemError(#[from] io::Error),
}

pub type AsyncResult<T> = Result<T, AsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_error_converts_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err: AsyncError = io_err.into();
        assert!(matches!(err, AsyncError::SystemError(_)));
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(AsyncError::Cancelled.to_string(), "operation cancelled");
        assert_eq!(AsyncError::FileTooShort.to_string(), "file too short");
    }
}
