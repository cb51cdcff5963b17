//! Error types for message parsing.

/// Result type alias for message parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Message parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid header line.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid transfer or header encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Invalid date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Empty input.
    #[error("Empty message")]
    Empty,
}
