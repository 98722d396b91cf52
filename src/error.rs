use std::string::FromUtf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Reading or seeking the underlying file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Request for an index entry beyond a fully scanned file
    #[error("line {line} is out of range, the file has {lines} lines")]
    OutOfRange { line: usize, lines: usize },

    /// Request for a line beyond a fully scanned file
    #[error("line {line} not found, the file has {lines} lines")]
    LineNotFound { line: usize, lines: usize },

    /// The file was truncated or replaced twice while serving a single request
    #[error("file changed repeatedly while being indexed")]
    Invalidated,

    #[error("invalid range [{from}, {to}) for a file with {lines} lines")]
    InvalidRange { from: isize, to: isize, lines: usize },

    #[error("line is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Binary search found no matching line
    #[error("not found")]
    NotFound,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A thread panicked while holding the shared reader
    #[error("shared reader lock poisoned")]
    Poisoned,
}

impl Error {
    /// Returns `true` for the errors meaning "there is no such line".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::LineNotFound { .. } | Error::OutOfRange { .. } | Error::NotFound
        )
    }
}
