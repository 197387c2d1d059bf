//! Crate error types.

use std::fmt;

/// Errors surfaced by request assembly.
///
/// Malformed ancillary input (hosts, ports, unopenable files, bad
/// header bytes) degrades to documented defaults instead of failing
/// the build. The one hard failure is an upload descriptor tree whose
/// structure violates the documented shape contract.
#[derive(Debug)]
pub enum Error {
    /// An upload descriptor violates the documented shape contract.
    InvalidUploadDescriptor(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidUploadDescriptor(msg) => {
                write!(f, "invalid upload descriptor: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, Error>;
